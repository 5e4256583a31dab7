//! Retry transient provider failures.

use std::iter::Take;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use super::PackageMetadataProvider;
use crate::constants::{DEFAULT_METADATA_RETRIES, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::PwiError;
use crate::requirement::{PackageName, Requirement};
use crate::version::Version;

/// Retries failed lookups of the wrapped provider.
///
/// Only errors for which [`PwiError::is_retryable`] holds are retried; an
/// unknown package name fails immediately. Delays start at 10ms, double on
/// each attempt and are capped at 500ms.
#[derive(Debug, Clone)]
pub struct RetryingProvider<P> {
    inner: P,
    retries: usize,
}

impl<P> RetryingProvider<P> {
    /// Wrap `inner` with the default retry count
    pub const fn new(inner: P) -> Self {
        Self {
            inner,
            retries: DEFAULT_METADATA_RETRIES,
        }
    }

    /// Set how many times a failed lookup is retried (0 disables retries)
    #[must_use]
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// The wrapped provider
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    fn strategy(&self) -> Take<ExponentialBackoff> {
        ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .factor(2)
            .take(self.retries)
    }
}

fn should_retry(error: &PwiError) -> bool {
    let retry = error.is_retryable();
    if retry {
        tracing::debug!("retrying metadata lookup after: {error}");
    }
    retry
}

impl<P: PackageMetadataProvider> PackageMetadataProvider for RetryingProvider<P> {
    async fn get_versions(&self, name: &PackageName) -> Result<Vec<Version>, PwiError> {
        RetryIf::spawn(self.strategy(), || self.inner.get_versions(name), should_retry).await
    }

    async fn get_dependencies(&self, name: &PackageName, version: &Version) -> Result<Vec<Requirement>, PwiError> {
        RetryIf::spawn(self.strategy(), || self.inner.get_dependencies(name, version), should_retry).await
    }
}
