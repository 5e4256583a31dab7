//! Bounded backtracking search over a built dependency graph.
//!
//! # Algorithm
//!
//! The search keeps an explicit stack of decisions, one per package:
//!
//! 1. **Pick a package**: among unassigned packages with at least one active
//!    constraint, the one with the most constraints; ties go to the name
//! 2. **Order candidates**: published versions admitted by the active
//!    constraints, in the configured preference order
//! 3. **Accept a candidate**: its declared requirements must hold for every
//!    package already assigned and leave every unassigned dependency with
//!    at least one admissible version
//! 4. **Unwind**: when a package runs out of candidates, the previous
//!    decision moves on to its next candidate
//!
//! A constraint is active when it comes from the root requirements or from a
//! version currently assigned. Packages only reachable through versions that
//! were not chosen are never assigned.
//!
//! # Limits
//!
//! The search gives up after `max_backtracks` unwinds. With the same graph
//! and ordering it always takes the same path.

mod types;

use std::collections::BTreeMap;

use crate::constants::DEFAULT_MAX_BACKTRACKS;
use crate::core::{CancellationSignal, PwiError};
use crate::requirement::PackageName;
use crate::resolver::graph::DependencyGraph;
use crate::resolver::strategy::CandidateOrdering;
use crate::version::Version;
use crate::version::conflict::{ConflictDetector, ConflictReport, ConstraintOrigin, diagnose};
use crate::version::constraints::{ConstraintSet, VersionConstraint};

pub use types::{BacktrackingResult, TerminationReason};

type ActiveConstraints = BTreeMap<PackageName, Vec<ConstraintOrigin>>;

/// One decision on the search stack.
struct Frame {
    package: PackageName,
    candidates: Vec<Version>,
    next: usize,
}

/// Finds one version per reachable package such that every active
/// constraint holds.
pub struct BacktrackingResolver<'a> {
    graph: &'a DependencyGraph,
    ordering: &'a dyn CandidateOrdering,
    cancel: &'a CancellationSignal,
    max_backtracks: usize,
    allow_prereleases: bool,

    /// Number of candidates tried so far
    attempts: usize,

    /// Number of unwinds so far
    backtracks: usize,

    /// Latest conflict seen for each package that ran out of candidates
    conflicts: BTreeMap<PackageName, ConflictReport>,
}

impl<'a> BacktrackingResolver<'a> {
    /// Create a resolver with default limits.
    pub fn new(
        graph: &'a DependencyGraph,
        ordering: &'a dyn CandidateOrdering,
        cancel: &'a CancellationSignal,
    ) -> Self {
        Self {
            graph,
            ordering,
            cancel,
            max_backtracks: DEFAULT_MAX_BACKTRACKS,
            allow_prereleases: false,
            attempts: 0,
            backtracks: 0,
            conflicts: BTreeMap::new(),
        }
    }

    /// Maximum number of unwinds before giving up
    #[must_use]
    pub const fn max_backtracks(mut self, max: usize) -> Self {
        self.max_backtracks = max;
        self
    }

    /// Consider pre-releases even when no constraint mentions one
    #[must_use]
    pub const fn allow_prereleases(mut self, allow: bool) -> Self {
        self.allow_prereleases = allow;
        self
    }

    /// Run the search.
    ///
    /// Failing to find an assignment is not an error; the returned result
    /// says why and carries the conflicts seen on the way.
    ///
    /// # Errors
    ///
    /// [`PwiError::OperationCancelled`] when the signal is raised between
    /// attempts.
    pub fn resolve(mut self) -> Result<BacktrackingResult, PwiError> {
        self.cancel.check()?;

        let definite = ConflictDetector::new(self.allow_prereleases).detect_definite(self.graph);
        if !definite.is_empty() {
            tracing::debug!("root requirements conflict on {} package(s), skipping search", definite.len());
            let conflicts = definite.into_iter().map(|r| (r.package.clone(), r)).collect();
            return Ok(BacktrackingResult::failed(conflicts, 0, 0, TerminationReason::DefiniteConflict));
        }

        let mut assignments: BTreeMap<PackageName, Version> = BTreeMap::new();
        let mut stack: Vec<Frame> = Vec::new();

        loop {
            let active = self.active_constraints(&assignments);
            let Some(package) = self.next_package(&active, &assignments) else {
                tracing::debug!(
                    "resolved {} package(s) after {} attempt(s) and {} backtrack(s)",
                    assignments.len(),
                    self.attempts,
                    self.backtracks
                );
                return Ok(BacktrackingResult {
                    resolved: true,
                    assignments,
                    conflicts: Vec::new(),
                    attempts: self.attempts,
                    backtracks: self.backtracks,
                    termination_reason: TerminationReason::Success,
                });
            };

            let candidates = self.candidates(&package, &active);
            tracing::trace!("deciding {package}: {} candidate(s)", candidates.len());
            stack.push(Frame {
                package,
                candidates,
                next: 0,
            });

            // Advance until the top decision holds an accepted candidate
            loop {
                self.cancel.check()?;
                let Some(frame) = stack.last_mut() else {
                    return Ok(self.fail(TerminationReason::Exhausted));
                };

                let active = self.active_constraints(&assignments);
                if let Some(version) = self.advance(frame, &active, &assignments) {
                    tracing::trace!("trying {} {version}", frame.package);
                    assignments.insert(frame.package.clone(), version);
                    break;
                }

                self.record_conflict(&frame.package, &active);
                stack.pop();
                let Some(previous) = stack.last() else {
                    return Ok(self.fail(TerminationReason::Exhausted));
                };

                self.backtracks += 1;
                if self.backtracks > self.max_backtracks {
                    tracing::debug!("giving up after {} backtrack(s)", self.max_backtracks);
                    return Ok(self.fail(TerminationReason::MaxBacktracks));
                }
                tracing::trace!("backtracking to {}", previous.package);
                assignments.remove(&previous.package);
            }
        }
    }

    /// Constraints from the root requirements and every assigned version.
    fn active_constraints(&self, assignments: &BTreeMap<PackageName, Version>) -> ActiveConstraints {
        let mut active = ActiveConstraints::new();
        let assigned = assignments
            .iter()
            .filter_map(|(name, version)| self.graph.declared(name, version))
            .flatten();
        for requirement in self.graph.roots().iter().chain(assigned) {
            active.entry(requirement.name.clone()).or_default().push(ConstraintOrigin {
                constraint: requirement.constraint.clone(),
                required_by: requirement.source.clone(),
            });
        }
        active
    }

    /// The most constrained unassigned package, ties broken by name.
    fn next_package(
        &self,
        active: &ActiveConstraints,
        assignments: &BTreeMap<PackageName, Version>,
    ) -> Option<PackageName> {
        active
            .iter()
            .filter(|(name, _)| !assignments.contains_key(*name))
            .min_by(|(a_name, a), (b_name, b)| b.len().cmp(&a.len()).then_with(|| a_name.cmp(b_name)))
            .map(|(name, _)| name.clone())
    }

    /// Expanded versions of `package` admitted by its active constraints,
    /// preferred first.
    fn candidates(&self, package: &PackageName, active: &ActiveConstraints) -> Vec<Version> {
        let Some(node) = self.graph.node(package) else {
            return Vec::new();
        };
        let origins = active.get(package).map(Vec::as_slice).unwrap_or_default();
        let set = ConstraintSet::from_constraints(origins.iter().map(|o| &o.constraint), self.allow_prereleases);

        let mut candidates = set.candidates(node.available_versions(), |a, b| self.ordering.compare(a, b));
        candidates.retain(|version| node.declared.contains_key(version));
        candidates
    }

    /// Move `frame` to its next acceptable candidate.
    fn advance(
        &mut self,
        frame: &mut Frame,
        active: &ActiveConstraints,
        assignments: &BTreeMap<PackageName, Version>,
    ) -> Option<Version> {
        while let Some(version) = frame.candidates.get(frame.next).cloned() {
            frame.next += 1;
            self.attempts += 1;
            if self.is_compatible(&frame.package, &version, active, assignments) {
                return Some(version);
            }
        }
        None
    }

    /// Check the requirements declared by `package` at `version` against
    /// current assignments, and forward-check unassigned dependencies.
    fn is_compatible(
        &self,
        package: &PackageName,
        version: &Version,
        active: &ActiveConstraints,
        assignments: &BTreeMap<PackageName, Version>,
    ) -> bool {
        let Some(declared) = self.graph.declared(package, version) else {
            return false;
        };

        let mut by_dependency: BTreeMap<&PackageName, Vec<&VersionConstraint>> = BTreeMap::new();
        for requirement in declared {
            by_dependency.entry(&requirement.name).or_default().push(&requirement.constraint);
        }

        for (dependency, constraints) in by_dependency {
            let chosen = if dependency == package {
                Some(version)
            } else {
                assignments.get(dependency)
            };

            let consistent = match chosen {
                Some(chosen) => constraints.iter().all(|c| c.matches(chosen)),
                None => self.has_candidate(dependency, active, &constraints),
            };
            if !consistent {
                tracing::trace!("{package} {version} rejected: requirement on {dependency} cannot be met");
                return false;
            }
        }
        true
    }

    /// Whether `package` keeps an admissible expanded version once `extra`
    /// constraints are added to its active ones.
    fn has_candidate(&self, package: &PackageName, active: &ActiveConstraints, extra: &[&VersionConstraint]) -> bool {
        let Some(node) = self.graph.node(package) else {
            return false;
        };
        let existing = active.get(package).into_iter().flatten().map(|o| &o.constraint);
        let set = ConstraintSet::from_constraints(existing.chain(extra.iter().copied()), self.allow_prereleases);
        node.available_versions().iter().any(|v| set.admits(v) && node.declared.contains_key(v))
    }

    fn record_conflict(&mut self, package: &PackageName, active: &ActiveConstraints) {
        let origins = active.get(package).cloned().unwrap_or_default();
        let available = self.graph.node(package).map(|n| n.available_versions()).unwrap_or_default();
        let report = diagnose(package, &origins, available, self.allow_prereleases).unwrap_or_else(|| {
            ConflictReport {
                package: package.clone(),
                constraints: origins,
                reason: format!("no candidate version of '{package}' is compatible with the versions selected so far"),
            }
        });
        self.conflicts.insert(package.clone(), report);
    }

    fn fail(&mut self, reason: TerminationReason) -> BacktrackingResult {
        BacktrackingResult::failed(std::mem::take(&mut self.conflicts), self.attempts, self.backtracks, reason)
    }
}
