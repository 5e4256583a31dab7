//! Package metadata providers.
//!
//! The resolver never talks to a package index directly. Everything it knows
//! about packages comes through [`PackageMetadataProvider`]: the list of
//! published versions of a name, and the requirements declared by one
//! version. Implementations must be deterministic for the lifetime of a
//! resolution; the same question always gets the same answer.
//!
//! # Implementations
//!
//! - [`IndexProvider`] - a static TOML index file, loaded once
//! - [`CachingProvider`] - memoizes successful answers of any provider
//! - [`RetryingProvider`] - retries transient failures with exponential backoff
//!
//! Wrappers compose; the CLI uses
//! `RetryingProvider<CachingProvider<IndexProvider>>`.
//!
//! # Errors
//!
//! A provider that cannot answer returns [`PwiError::MetadataUnavailable`].
//! Timeouts are not the provider's concern; the graph builder bounds every
//! call with the configured metadata timeout.

mod caching;
mod index;
mod retry;

pub use caching::CachingProvider;
pub use index::IndexProvider;
pub use retry::RetryingProvider;

use std::future::Future;
use std::sync::Arc;

use crate::constants::{MAX_SUGGESTIONS, SIMILARITY_THRESHOLD_PERCENT};
use crate::core::PwiError;
use crate::requirement::{PackageName, Requirement};
use crate::version::Version;

/// Source of version lists and dependency declarations.
pub trait PackageMetadataProvider: Send + Sync {
    /// Every published version of `name`, in any order.
    fn get_versions(&self, name: &PackageName) -> impl Future<Output = Result<Vec<Version>, PwiError>> + Send;

    /// Requirements declared by `name` at `version`.
    ///
    /// The returned requirements' `source` is ignored; the graph builder
    /// attributes them to `name version`.
    fn get_dependencies(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> impl Future<Output = Result<Vec<Requirement>, PwiError>> + Send;
}

impl<P: PackageMetadataProvider> PackageMetadataProvider for Arc<P> {
    fn get_versions(&self, name: &PackageName) -> impl Future<Output = Result<Vec<Version>, PwiError>> + Send {
        self.as_ref().get_versions(name)
    }

    fn get_dependencies(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> impl Future<Output = Result<Vec<Requirement>, PwiError>> + Send {
        self.as_ref().get_dependencies(name, version)
    }
}

/// Names from `known` close enough to `target` to be worth suggesting,
/// closest first.
pub(crate) fn similar_names<'a>(target: &str, known: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> =
        known.into_iter().map(|name| (strsim::levenshtein(target, name), name)).collect();
    scored.sort();

    let threshold = target.len().max(1) * SIMILARITY_THRESHOLD_PERCENT / 100;
    scored
        .into_iter()
        .filter(|(distance, _)| *distance <= threshold)
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.to_string())
        .collect()
}
