//! Public types for backtracking results.

use std::collections::BTreeMap;

use crate::requirement::PackageName;
use crate::version::Version;
use crate::version::conflict::ConflictReport;

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every reachable package has a version
    Success,

    /// The root requirements contradict each other; no search was needed
    DefiniteConflict,

    /// Every combination of candidates was tried
    Exhausted,

    /// Reached the backtrack limit
    MaxBacktracks,
}

/// Result of a backtracking search.
#[derive(Debug, Clone)]
pub struct BacktrackingResult {
    /// Whether a consistent assignment was found
    pub resolved: bool,

    /// The chosen version of each package, empty unless resolved
    pub assignments: BTreeMap<PackageName, Version>,

    /// Conflicts observed while unwinding, one per package, sorted by name
    pub conflicts: Vec<ConflictReport>,

    /// Number of candidate versions tried
    pub attempts: usize,

    /// Number of times a package's candidates ran out and the search unwound
    pub backtracks: usize,

    /// Reason for termination
    pub termination_reason: TerminationReason,
}

impl BacktrackingResult {
    pub(super) fn failed(
        conflicts: BTreeMap<PackageName, ConflictReport>,
        attempts: usize,
        backtracks: usize,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            resolved: false,
            assignments: BTreeMap::new(),
            conflicts: conflicts.into_values().collect(),
            attempts,
            backtracks,
            termination_reason,
        }
    }
}
