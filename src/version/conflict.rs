//! Version conflict detection and reporting.
//!
//! The detector looks at every package in a built dependency graph and asks
//! whether any available version satisfies all constraints placed on it.
//! It is pessimistic: a constraint counts even when it was declared by a
//! version of a dependent that the resolver might never select. A clean
//! report therefore proves there is no per-package contradiction, while a
//! non-empty one is a diagnostic, not a proof of unresolvability. The
//! resolver only treats reports whose constraints all come from the root
//! requirement list as definite.

use std::fmt;

use serde::Serialize;

use crate::requirement::{PackageName, Requester};
use crate::resolver::graph::DependencyGraph;
use crate::version::Version;
use crate::version::constraints::{ConstraintSet, VersionConstraint};

/// One constraint on a package and who placed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConstraintOrigin {
    /// The constraint
    pub constraint: VersionConstraint,
    /// Who declared it
    pub required_by: Requester,
}

impl fmt::Display for ConstraintOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (required by {})", self.constraint, self.required_by)
    }
}

/// A package whose constraints cannot all be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// The conflicting package
    pub package: PackageName,
    /// Every constraint that was in force, with its requester
    pub constraints: Vec<ConstraintOrigin>,
    /// Human-readable explanation
    pub reason: String,
}

impl ConflictReport {
    /// Whether every constraint comes from the root requirement list, which
    /// makes the conflict independent of any version choice.
    #[must_use]
    pub fn is_root_only(&self) -> bool {
        self.constraints.iter().all(|c| c.required_by == Requester::Root)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.reason)?;
        for origin in &self.constraints {
            write!(f, "\n    {origin}")?;
        }
        Ok(())
    }
}

/// Explain why no version of `package` is admitted by `origins`, or `None`
/// when at least one version is.
#[must_use]
pub fn diagnose(
    package: &PackageName,
    origins: &[ConstraintOrigin],
    available: &[Version],
    allow_prereleases: bool,
) -> Option<ConflictReport> {
    let set = ConstraintSet::from_constraints(origins.iter().map(|o| &o.constraint), allow_prereleases);
    if available.iter().any(|v| set.admits(v)) {
        return None;
    }

    let reason = if available.is_empty() {
        format!("no versions of '{package}' are available")
    } else if let Some(origin) =
        origins.iter().find(|o| !available.iter().any(|v| o.constraint.matches(v)))
    {
        format!("no available version matches {} (required by {})", origin.constraint, origin.required_by)
    } else if available.iter().any(|v| set.satisfies(v)) {
        "only pre-release versions match; allow pre-releases to consider them".to_string()
    } else {
        let listed: Vec<String> = available.iter().map(ToString::to_string).collect();
        format!(
            "no available version satisfies all {} constraints (available: {})",
            origins.len(),
            listed.join(", ")
        )
    };

    Some(ConflictReport {
        package: package.clone(),
        constraints: origins.to_vec(),
        reason,
    })
}

/// Finds per-package contradictions in a dependency graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
    allow_prereleases: bool,
}

impl ConflictDetector {
    /// A detector applying the given pre-release policy
    #[must_use]
    pub const fn new(allow_prereleases: bool) -> Self {
        Self {
            allow_prereleases,
        }
    }

    /// One report per package with no admissible version, sorted by name.
    ///
    /// Pure: the graph is not modified.
    #[must_use]
    pub fn detect(&self, graph: &DependencyGraph) -> Vec<ConflictReport> {
        let reports: Vec<ConflictReport> = graph
            .packages()
            .filter_map(|node| {
                diagnose(&node.name, &node.constraints, node.available_versions(), self.allow_prereleases)
            })
            .collect();

        if !reports.is_empty() {
            tracing::debug!("conflict detection found {} conflicting package(s)", reports.len());
        }
        reports
    }

    /// Only the reports that hold regardless of version choices.
    #[must_use]
    pub fn detect_definite(&self, graph: &DependencyGraph) -> Vec<ConflictReport> {
        self.detect(graph).into_iter().filter(ConflictReport::is_root_only).collect()
    }
}
