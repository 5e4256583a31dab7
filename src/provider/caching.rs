//! In-memory memoization of provider answers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::PackageMetadataProvider;
use crate::core::PwiError;
use crate::requirement::{PackageName, Requirement};
use crate::version::Version;

/// One cache slot; concurrent misses on the same key wait for a single fetch.
type Slot<T> = Arc<OnceCell<T>>;

/// Caches successful answers of the wrapped provider.
///
/// Failures are not cached, so a transient error can be retried. Entries
/// live as long as the provider; clones share the cache.
#[derive(Debug, Clone)]
pub struct CachingProvider<P> {
    inner: P,
    versions: Arc<DashMap<PackageName, Slot<Vec<Version>>>>,
    dependencies: Arc<DashMap<(PackageName, Version), Slot<Vec<Requirement>>>>,
}

impl<P> CachingProvider<P> {
    /// Wrap `inner`
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            versions: Arc::new(DashMap::new()),
            dependencies: Arc::new(DashMap::new()),
        }
    }

    /// The wrapped provider
    pub const fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: PackageMetadataProvider> PackageMetadataProvider for CachingProvider<P> {
    async fn get_versions(&self, name: &PackageName) -> Result<Vec<Version>, PwiError> {
        let slot = Arc::clone(self.versions.entry(name.clone()).or_default().value());
        slot.get_or_try_init(|| self.inner.get_versions(name)).await.cloned()
    }

    async fn get_dependencies(&self, name: &PackageName, version: &Version) -> Result<Vec<Requirement>, PwiError> {
        let key = (name.clone(), version.clone());
        let slot = Arc::clone(self.dependencies.entry(key).or_default().value());
        slot.get_or_try_init(|| self.inner.get_dependencies(name, version)).await.cloned()
    }
}
