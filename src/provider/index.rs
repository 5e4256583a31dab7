//! Static package index loaded from TOML.
//!
//! ```toml
//! [packages.flask]
//! "2.0.3" = ["werkzeug>=2.0", "jinja2>=3.0", "click>=7.1.2"]
//! "1.1.4" = ["werkzeug<2.0,>=0.15"]
//!
//! [packages.werkzeug]
//! "2.0.3" = []
//! ```
//!
//! Package names are normalized on load, so `[packages.Flask_Login]` and a
//! requirement on `flask-login` refer to the same entry. Every version and
//! requirement is validated when the index is loaded, so lookups never
//! fail on malformed data.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{PackageMetadataProvider, similar_names};
use crate::core::PwiError;
use crate::requirement::{PackageName, Requirement};
use crate::version::Version;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexFile {
    #[serde(default)]
    packages: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// An in-memory package index.
#[derive(Debug, Clone, Default)]
pub struct IndexProvider {
    packages: BTreeMap<PackageName, BTreeMap<Version, Vec<Requirement>>>,
}

impl IndexProvider {
    /// An empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index file.
    pub async fn load(path: &Path) -> Result<Self, PwiError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PwiError::IoError(std::io::Error::new(
                e.kind(),
                format!("cannot read package index {}: {e}", path.display()),
            ))
        })?;
        let index = Self::from_toml_str(&content)?;
        tracing::debug!("loaded package index {} ({} packages)", path.display(), index.packages.len());
        Ok(index)
    }

    /// Parse index TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, PwiError> {
        let file: IndexFile = toml::from_str(content)?;
        let mut index = Self::new();
        for (name, versions) in &file.packages {
            PackageName::parse(name)?;
            for (version, dependencies) in versions {
                let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
                index.insert(name, version, &dependencies)?;
            }
        }
        Ok(index)
    }

    /// Add (or replace) one published version and its requirements.
    pub fn insert(&mut self, name: &str, version: &str, dependencies: &[&str]) -> Result<(), PwiError> {
        let name = PackageName::parse(name)?;
        let version = Version::parse(version)?;
        let dependencies = dependencies.iter().map(|d| Requirement::parse(d)).collect::<Result<Vec<_>, _>>()?;
        self.packages.entry(name).or_default().insert(version, dependencies);
        Ok(())
    }

    /// Number of distinct packages
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn lookup(&self, name: &PackageName) -> Result<&BTreeMap<Version, Vec<Requirement>>, PwiError> {
        self.packages.get(name).ok_or_else(|| PwiError::MetadataUnavailable {
            package: name.to_string(),
            reason: "package not found in index".to_string(),
            suggestions: similar_names(name.as_str(), self.packages.keys().map(PackageName::as_str)),
        })
    }
}

impl PackageMetadataProvider for IndexProvider {
    async fn get_versions(&self, name: &PackageName) -> Result<Vec<Version>, PwiError> {
        Ok(self.lookup(name)?.keys().cloned().collect())
    }

    async fn get_dependencies(&self, name: &PackageName, version: &Version) -> Result<Vec<Requirement>, PwiError> {
        self.lookup(name)?.get(version).cloned().ok_or_else(|| {
            PwiError::metadata_unavailable(name, format!("version {version} not found in index"))
        })
    }
}
