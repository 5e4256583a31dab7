//! Fixtures for provider-backed tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::PwiError;
use crate::provider::{IndexProvider, PackageMetadataProvider};
use crate::requirement::{PackageName, Requirement};
use crate::version::Version;

/// Builder for package indexes.
///
/// Panics on malformed names, versions or requirements; it is meant for
/// hand-written test data.
#[derive(Debug, Clone, Default)]
pub struct IndexFixture {
    packages: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl IndexFixture {
    /// An empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `name` at `version` with the given requirements.
    #[must_use]
    pub fn package(mut self, name: &str, version: &str, dependencies: &[&str]) -> Self {
        self.packages
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), dependencies.iter().map(|d| (*d).to_string()).collect());
        self
    }

    /// Build the in-memory provider.
    pub fn build(&self) -> IndexProvider {
        let mut index = IndexProvider::new();
        for (name, versions) in &self.packages {
            for (version, dependencies) in versions {
                let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
                index
                    .insert(name, version, &dependencies)
                    .unwrap_or_else(|e| panic!("invalid fixture entry {name} {version}: {e}"));
            }
        }
        index
    }

    /// Render the index as TOML in the on-disk index format.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        for (name, versions) in &self.packages {
            out.push_str(&format!("[packages.{name:?}]\n"));
            for (version, dependencies) in versions {
                let quoted: Vec<String> = dependencies.iter().map(|d| format!("{d:?}")).collect();
                out.push_str(&format!("{version:?} = [{}]\n", quoted.join(", ")));
            }
            out.push('\n');
        }
        out
    }

    /// Write the TOML index to `dir/index.toml` and return its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("index.toml");
        std::fs::write(&path, self.to_toml()).unwrap_or_else(|e| panic!("cannot write index: {e}"));
        path
    }
}

/// A provider wrapper that counts calls.
#[derive(Debug, Default)]
pub struct CountingProvider<P> {
    inner: P,
    version_calls: AtomicUsize,
    dependency_calls: AtomicUsize,
}

impl<P> CountingProvider<P> {
    /// Wrap `inner`
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            version_calls: AtomicUsize::new(0),
            dependency_calls: AtomicUsize::new(0),
        }
    }

    /// `get_versions` calls so far
    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    /// `get_dependencies` calls so far
    pub fn dependency_calls(&self) -> usize {
        self.dependency_calls.load(Ordering::SeqCst)
    }
}

impl<P: PackageMetadataProvider> PackageMetadataProvider for CountingProvider<P> {
    async fn get_versions(&self, name: &PackageName) -> Result<Vec<Version>, PwiError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_versions(name).await
    }

    async fn get_dependencies(&self, name: &PackageName, version: &Version) -> Result<Vec<Requirement>, PwiError> {
        self.dependency_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_dependencies(name, version).await
    }
}
