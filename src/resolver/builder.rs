//! Breadth-first, lazy construction of the dependency graph.
//!
//! The builder works in rounds. Each round takes the current frontier (the
//! packages whose constraint list changed since they were last looked at)
//! and
//!
//! 1. fetches the version list of every frontier package that has none yet,
//! 2. picks the versions that some constraint on the package admits and
//!    that have not been expanded before,
//! 3. fetches the requirements of those `(package, version)` pairs, and
//! 4. merges the requirements into the graph, which puts their targets on
//!    the next frontier.
//!
//! Each `(package, version)` pair is expanded at most once, so the build
//! terminates even when the metadata contains cycles. Queries within a round
//! run concurrently (bounded by `max_parallel_queries`) and every query is
//! bounded by the metadata timeout. Results are merged in frontier order, so
//! the resulting graph does not depend on which query finished first.
//!
//! Cancellation is checked before the first provider call and at the start
//! of every round.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::graph::DependencyGraph;
use crate::constants::{DEFAULT_MAX_PARALLEL_QUERIES, DEFAULT_METADATA_TIMEOUT};
use crate::core::{CancellationSignal, PwiError};
use crate::provider::PackageMetadataProvider;
use crate::requirement::{PackageName, Requester, Requirement};
use crate::version::Version;

/// Builds a [`DependencyGraph`] from root requirements.
pub struct DependencyGraphBuilder<'a, P> {
    provider: &'a P,
    cancel: CancellationSignal,
    metadata_timeout: Duration,
    max_parallel_queries: usize,
    allow_prereleases: bool,
}

/// Counters from one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Frontier rounds processed
    pub rounds: usize,
    /// Version-list queries issued
    pub version_queries: usize,
    /// Dependency queries issued
    pub dependency_queries: usize,
}

impl<'a, P: PackageMetadataProvider> DependencyGraphBuilder<'a, P> {
    /// A builder with default timeout and concurrency.
    pub fn new(provider: &'a P, cancel: CancellationSignal) -> Self {
        Self {
            provider,
            cancel,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            max_parallel_queries: DEFAULT_MAX_PARALLEL_QUERIES,
            allow_prereleases: false,
        }
    }

    /// Bound every provider call by `timeout`
    #[must_use]
    pub const fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// At most `n` queries in flight (minimum 1)
    #[must_use]
    pub fn max_parallel_queries(mut self, n: usize) -> Self {
        self.max_parallel_queries = n.max(1);
        self
    }

    /// Expand pre-release versions too
    #[must_use]
    pub const fn allow_prereleases(mut self, allow: bool) -> Self {
        self.allow_prereleases = allow;
        self
    }

    /// Build the graph for `roots`.
    ///
    /// # Errors
    ///
    /// - [`PwiError::OperationCancelled`] when the signal is raised
    /// - [`PwiError::MetadataUnavailable`] when a required package cannot be
    ///   looked up or a lookup exceeds the timeout
    pub async fn build(&self, roots: &[Requirement]) -> Result<(DependencyGraph, BuildStats), PwiError> {
        self.cancel.check()?;

        let mut graph = DependencyGraph::new(roots.to_vec());
        let mut stats = BuildStats::default();
        let mut expanded: HashSet<(PackageName, Version)> = HashSet::new();
        let mut frontier: BTreeSet<PackageName> = roots.iter().map(|r| r.name.clone()).collect();

        while !frontier.is_empty() {
            self.cancel.check()?;
            stats.rounds += 1;
            let current: Vec<PackageName> = std::mem::take(&mut frontier).into_iter().collect();
            tracing::debug!("graph round {}: {} package(s) on the frontier", stats.rounds, current.len());

            let unfetched: Vec<PackageName> = current
                .iter()
                .filter(|name| graph.node(name).is_some_and(|node| node.available.is_none()))
                .cloned()
                .collect();
            stats.version_queries += unfetched.len();
            for (name, versions) in self.fetch_versions(unfetched).await? {
                tracing::trace!("{name}: {} published version(s)", versions.len());
                graph.set_available(&name, versions);
            }

            let mut pending = Vec::new();
            for name in &current {
                let Some(node) = graph.node(name) else {
                    continue;
                };
                for version in node.viable_versions(self.allow_prereleases) {
                    if expanded.insert((name.clone(), version.clone())) {
                        pending.push((name.clone(), version));
                    }
                }
            }

            self.cancel.check()?;
            stats.dependency_queries += pending.len();
            for ((name, version), requirements) in self.fetch_dependencies(pending).await? {
                let requester = Requester::package(name.clone(), version.clone());
                let requirements: Vec<Requirement> =
                    requirements.into_iter().map(|r| r.with_source(requester.clone())).collect();
                frontier.extend(requirements.iter().map(|r| r.name.clone()));
                graph.record_declared(&name, &version, requirements);
            }
        }

        tracing::debug!(
            "dependency graph complete: {} package(s), {} edge(s), {} round(s)",
            graph.len(),
            graph.edge_count(),
            stats.rounds
        );
        Ok((graph, stats))
    }

    async fn fetch_versions(&self, names: Vec<PackageName>) -> Result<Vec<(PackageName, Vec<Version>)>, PwiError> {
        let results: Vec<Result<(PackageName, Vec<Version>), PwiError>> = stream::iter(names)
            .map(|name| async move {
                let versions = self.bounded(&name, self.provider.get_versions(&name)).await?;
                Ok::<_, PwiError>((name, versions))
            })
            .buffered(self.max_parallel_queries)
            .collect()
            .await;
        results.into_iter().collect()
    }

    async fn fetch_dependencies(
        &self,
        pairs: Vec<(PackageName, Version)>,
    ) -> Result<Vec<((PackageName, Version), Vec<Requirement>)>, PwiError> {
        let results: Vec<Result<((PackageName, Version), Vec<Requirement>), PwiError>> = stream::iter(pairs)
            .map(|(name, version)| async move {
                let requirements =
                    self.bounded(&name, self.provider.get_dependencies(&name, &version)).await?;
                Ok::<_, PwiError>(((name, version), requirements))
            })
            .buffered(self.max_parallel_queries)
            .collect()
            .await;
        results.into_iter().collect()
    }

    async fn bounded<T>(
        &self,
        package: &PackageName,
        query: impl Future<Output = Result<T, PwiError>>,
    ) -> Result<T, PwiError> {
        match tokio::time::timeout(self.metadata_timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(PwiError::metadata_unavailable(
                package,
                format!("lookup timed out after {}s", self.metadata_timeout.as_secs_f64()),
            )),
        }
    }
}
