//! Dependency resolution for pwi.
//!
//! This module turns a set of root requirements into an ordered installation
//! plan. It is independent of how metadata is obtained (see
//! [`crate::provider`]) and of how the plan is executed (see
//! [`crate::installer`]).
//!
//! # Resolution Process
//!
//! 1. **Graph construction** ([`builder::DependencyGraphBuilder`]): starting
//!    from the root requirements, query the metadata provider breadth-first
//!    and record every constraint together with the package that placed it
//! 2. **Conflict detection** ([`crate::version::conflict::ConflictDetector`]):
//!    packages whose constraints admit no published version; root-only
//!    conflicts end resolution before any search
//! 3. **Version selection** ([`Resolver`]): bounded backtracking over the
//!    graph, most constrained package first, preferred candidate first
//! 4. **Planning** ([`planner::InstallationPlanner`]): topological order of
//!    the selected versions, ties broken by name
//!
//! # Determinism
//!
//! Every collection the resolver iterates is ordered, and provider answers
//! are merged in a fixed order regardless of which query finished first. The
//! same request against the same metadata always yields the same plan.
//!
//! # Requests
//!
//! A [`ResolutionRequest`] is assembled once by the caller from defaults,
//! configuration and command-line flags, then treated as read-only. Nothing
//! in this module reads configuration or the environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use pwi_cli::core::CancellationSignal;
//! use pwi_cli::provider::IndexProvider;
//! use pwi_cli::requirement::Requirement;
//! use pwi_cli::resolver::{ResolutionRequest, ResolveOptions, resolve};
//!
//! # async fn example() -> Result<(), pwi_cli::core::PwiError> {
//! let provider = IndexProvider::load("index.toml".as_ref()).await?;
//! let request = ResolutionRequest::new(
//!     vec![Requirement::parse("flask>=2.0")?],
//!     ResolveOptions::default(),
//! );
//!
//! let outcome = resolve(&request, &provider, &CancellationSignal::new()).await?;
//! for package in &outcome.plan.packages {
//!     println!("{}", package.pin());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backtracking;
pub mod builder;
pub mod graph;
mod graph_queries;
pub mod planner;
pub mod strategy;


use std::time::{Duration, Instant};

use serde::Serialize;

use crate::constants::{DEFAULT_MAX_BACKTRACKS, DEFAULT_MAX_PARALLEL_QUERIES, DEFAULT_METADATA_TIMEOUT};
use crate::core::{CancellationSignal, PwiError};
use crate::provider::PackageMetadataProvider;
use crate::requirement::{PackageName, Requirement};
use crate::version::conflict::{ConflictDetector, ConflictReport};

pub use backtracking::{BacktrackingResolver, BacktrackingResult, TerminationReason};
pub use builder::{BuildStats, DependencyGraphBuilder};
pub use graph::{DependencyGraph, PackageNode};
pub use planner::{InstallationPlanner, PlannedPackage, ResolutionPlan};
pub use strategy::{CandidateOrdering, SelectionStrategy};

/// Tunables for one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Timeout for a single metadata lookup
    pub metadata_timeout: Duration,
    /// Total number of unwinds before giving up
    pub max_backtracks: usize,
    /// Candidate preference
    pub strategy: SelectionStrategy,
    /// Consider pre-releases even when no constraint mentions one
    pub allow_prereleases: bool,
    /// Metadata lookups in flight at once
    pub max_parallel_queries: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            max_backtracks: DEFAULT_MAX_BACKTRACKS,
            strategy: SelectionStrategy::default(),
            allow_prereleases: false,
            max_parallel_queries: DEFAULT_MAX_PARALLEL_QUERIES,
        }
    }
}

/// Everything a resolution needs, fixed before it starts.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    roots: Vec<Requirement>,
    options: ResolveOptions,
}

impl ResolutionRequest {
    /// Freeze `roots` and `options` into a request.
    #[must_use]
    pub const fn new(roots: Vec<Requirement>, options: ResolveOptions) -> Self {
        Self {
            roots,
            options,
        }
    }

    /// The root requirements, in the order given
    #[must_use]
    pub fn roots(&self) -> &[Requirement] {
        &self.roots
    }

    /// The options
    #[must_use]
    pub const fn options(&self) -> &ResolveOptions {
        &self.options
    }

    fn builder<'a, P: PackageMetadataProvider>(
        &self,
        provider: &'a P,
        cancel: &CancellationSignal,
    ) -> DependencyGraphBuilder<'a, P> {
        DependencyGraphBuilder::new(provider, cancel.clone())
            .metadata_timeout(self.options.metadata_timeout)
            .max_parallel_queries(self.options.max_parallel_queries)
            .allow_prereleases(self.options.allow_prereleases)
    }
}

/// Counters from the version search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Candidate versions tried
    pub attempts: usize,
    /// Unwinds performed
    pub backtracks: usize,
}

/// Counters from a whole resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Graph construction
    pub build: BuildStats,
    /// Version search
    pub search: SearchStats,
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    /// The explored graph, with the selected version set on every planned package
    pub graph: DependencyGraph,
    /// The installation plan
    pub plan: ResolutionPlan,
    /// Counters
    pub stats: ResolutionStats,
}

/// Selects one version per package on a built graph.
pub struct Resolver {
    ordering: Box<dyn CandidateOrdering>,
    max_backtracks: usize,
    allow_prereleases: bool,
    cancel: CancellationSignal,
}

impl Resolver {
    /// A resolver configured from `options`.
    #[must_use]
    pub fn new(options: &ResolveOptions, cancel: CancellationSignal) -> Self {
        Self {
            ordering: Box::new(options.strategy),
            max_backtracks: options.max_backtracks,
            allow_prereleases: options.allow_prereleases,
            cancel,
        }
    }

    /// Replace the candidate ordering, e.g. with a comparator closure.
    #[must_use]
    pub fn with_ordering(mut self, ordering: impl CandidateOrdering + 'static) -> Self {
        self.ordering = Box::new(ordering);
        self
    }

    /// Select versions and plan their installation.
    ///
    /// On success every planned package has its `selected_version` set in
    /// `graph`. On failure the graph holds no selections and the packages
    /// named by the conflicts are marked unresolved.
    ///
    /// # Errors
    ///
    /// - [`PwiError::Unresolvable`] when no consistent assignment exists or
    ///   the backtrack limit was reached
    /// - [`PwiError::CyclicDependency`] when the selected versions require
    ///   each other in a cycle
    /// - [`PwiError::OperationCancelled`] when the signal is raised
    pub fn resolve(&self, graph: &mut DependencyGraph) -> Result<(ResolutionPlan, SearchStats), PwiError> {
        graph.clear_selections();

        let result = BacktrackingResolver::new(graph, self.ordering.as_ref(), &self.cancel)
            .max_backtracks(self.max_backtracks)
            .allow_prereleases(self.allow_prereleases)
            .resolve()?;
        let stats = SearchStats {
            attempts: result.attempts,
            backtracks: result.backtracks,
        };

        if !result.resolved {
            if result.termination_reason == TerminationReason::MaxBacktracks {
                tracing::warn!("gave up after {} backtracks", result.backtracks);
            }
            for conflict in &result.conflicts {
                graph.mark_unresolved(&conflict.package);
            }
            return Err(PwiError::Unresolvable {
                conflicts: result.conflicts,
                backtracks: result.backtracks,
            });
        }

        let plan = InstallationPlanner.plan(&result.assignments, graph)?;
        for (name, version) in result.assignments {
            graph.select(&name, version);
        }
        Ok((plan, stats))
    }
}

/// Build the dependency graph for `request`, select versions and plan the
/// installation.
///
/// # Errors
///
/// Any error of [`explore`] or [`Resolver::resolve`].
pub async fn resolve<P: PackageMetadataProvider>(
    request: &ResolutionRequest,
    provider: &P,
    cancel: &CancellationSignal,
) -> Result<ResolutionOutcome, PwiError> {
    let start = Instant::now();
    tracing::info!("resolving {} root requirement(s)", request.roots().len());

    let (mut graph, build) = explore(request, provider, cancel).await?;
    let (plan, search) = Resolver::new(request.options(), cancel.clone()).resolve(&mut graph)?;

    tracing::info!(
        "resolved {} package(s) in {:.2?} ({} backtrack(s))",
        plan.len(),
        start.elapsed(),
        search.backtracks
    );
    Ok(ResolutionOutcome {
        graph,
        plan,
        stats: ResolutionStats {
            build,
            search,
        },
    })
}

/// Build the dependency graph for `request` without selecting versions.
///
/// Circular declarations found in the graph are logged as warnings.
///
/// # Errors
///
/// Any error of [`DependencyGraphBuilder::build`].
pub async fn explore<P: PackageMetadataProvider>(
    request: &ResolutionRequest,
    provider: &P,
    cancel: &CancellationSignal,
) -> Result<(DependencyGraph, BuildStats), PwiError> {
    let (graph, build) = request.builder(provider, cancel).build(request.roots()).await?;
    for cycle in graph.find_cycles() {
        let chain: Vec<&str> = cycle.iter().map(PackageName::as_str).collect();
        tracing::warn!("circular dependency declared: {}", chain.join(" -> "));
    }
    Ok((graph, build))
}

/// Build the dependency graph for `request` and report every package whose
/// constraints admit no available version, without selecting versions.
///
/// The reports are pessimistic: a constraint counts even if it was declared
/// by a version that resolution would not pick.
///
/// # Errors
///
/// Any error of [`explore`].
pub async fn check<P: PackageMetadataProvider>(
    request: &ResolutionRequest,
    provider: &P,
    cancel: &CancellationSignal,
) -> Result<(DependencyGraph, Vec<ConflictReport>), PwiError> {
    let (graph, _) = explore(request, provider, cancel).await?;
    let reports = ConflictDetector::new(request.options().allow_prereleases).detect(&graph);
    Ok((graph, reports))
}
