//! Constraint set implementation for managing multiple version constraints.
//!
//! A package usually receives one constraint per requiring edge: the root
//! requirement list, and every selected dependent. [`ConstraintSet`] collects
//! them and answers the questions the detector and the resolver ask: does a
//! version satisfy all of them, which of the available versions remain, and
//! which one is preferred.
//!
//! # Pre-release Policy
//!
//! Pre-release versions are only candidates when the set was built with
//! pre-releases allowed, or when at least one constraint in the set names a
//! pre-release explicitly (`==2.0.0rc1`, `>=3.0.0b1`).

use std::cmp::Ordering;

use super::VersionConstraint;
use crate::version::Version;

/// All the constraints placed on one package.
///
/// # Examples
///
/// ```rust
/// use pwi_cli::version::Version;
/// use pwi_cli::version::constraints::{ConstraintSet, VersionConstraint};
///
/// let mut set = ConstraintSet::new(false);
/// set.add(VersionConstraint::parse(">=1.0")?);
/// set.add(VersionConstraint::parse("<2.0")?);
///
/// let available = vec![
///     Version::parse("0.9")?,
///     Version::parse("1.0")?,
///     Version::parse("1.5")?,
///     Version::parse("2.0")?,
/// ];
/// let candidates = set.candidates(&available, |a: &Version, b: &Version| b.cmp(a));
/// assert_eq!(candidates, vec![Version::parse("1.5")?, Version::parse("1.0")?]);
/// # Ok::<(), pwi_cli::core::PwiError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<VersionConstraint>,
    allow_prereleases: bool,
}

impl ConstraintSet {
    /// An empty set; `allow_prereleases` opts into pre-release candidates
    /// regardless of what the constraints say.
    #[must_use]
    pub const fn new(allow_prereleases: bool) -> Self {
        Self {
            constraints: Vec::new(),
            allow_prereleases,
        }
    }

    /// Build a set from an iterator of constraints.
    pub fn from_constraints<'a>(
        constraints: impl IntoIterator<Item = &'a VersionConstraint>,
        allow_prereleases: bool,
    ) -> Self {
        let mut set = Self::new(allow_prereleases);
        for constraint in constraints {
            set.add(constraint.clone());
        }
        set
    }

    /// Add a constraint.
    ///
    /// Contradicting constraints are accepted; they simply leave no candidate.
    pub fn add(&mut self, constraint: VersionConstraint) {
        if !constraint.is_any() {
            self.constraints.push(constraint);
        }
    }

    /// Whether `version` satisfies every constraint.
    ///
    /// Does not apply the pre-release policy; see [`ConstraintSet::admits`].
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Whether `version` is a candidate: it satisfies every constraint and
    /// passes the pre-release policy.
    #[must_use]
    pub fn admits(&self, version: &Version) -> bool {
        (self.allows_prerelease() || !version.is_prerelease()) && self.satisfies(version)
    }

    /// Whether pre-release versions are candidates for this set.
    #[must_use]
    pub fn allows_prerelease(&self) -> bool {
        self.allow_prereleases || self.constraints.iter().any(VersionConstraint::mentions_prerelease)
    }

    /// Every admitted version, ordered by `preference` (preferred first).
    #[must_use]
    pub fn candidates<F>(&self, versions: &[Version], preference: F) -> Vec<Version>
    where
        F: Fn(&Version, &Version) -> Ordering,
    {
        let mut candidates: Vec<Version> = versions.iter().filter(|v| self.admits(v)).cloned().collect();
        candidates.sort_by(|a, b| preference(a, b));
        candidates.dedup();
        candidates
    }

    /// Number of non-trivial constraints
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the set holds no non-trivial constraint
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<Version> {
        list.iter().map(|v| Version::parse(v).unwrap()).collect()
    }

    fn highest(a: &Version, b: &Version) -> Ordering {
        b.cmp(a)
    }

    #[test]
    fn test_intersection_of_constraints() {
        let mut set = ConstraintSet::new(false);
        set.add(VersionConstraint::parse(">=1.0").unwrap());
        set.add(VersionConstraint::parse("<1.5").unwrap());

        let available = versions(&["0.9", "1.0", "1.2", "1.5"]);
        assert_eq!(set.candidates(&available, highest), versions(&["1.2", "1.0"]));
    }

    #[test]
    fn test_contradiction_leaves_no_candidate() {
        let mut set = ConstraintSet::new(false);
        set.add(VersionConstraint::parse("==1.0.0").unwrap());
        set.add(VersionConstraint::parse("==2.0.0").unwrap());

        assert!(set.candidates(&versions(&["1.0.0", "2.0.0"]), highest).is_empty());
    }

    #[test]
    fn test_prereleases_excluded_by_default() {
        let mut set = ConstraintSet::new(false);
        set.add(VersionConstraint::parse(">=1.0").unwrap());

        let available = versions(&["1.0", "2.0rc1"]);
        assert_eq!(set.candidates(&available, highest), versions(&["1.0"]));
        assert!(!set.allows_prerelease());
    }

    #[test]
    fn test_prereleases_opt_in() {
        let available = versions(&["1.0", "2.0rc1"]);

        let set = ConstraintSet::new(true);
        assert_eq!(set.candidates(&available, highest), versions(&["2.0rc1", "1.0"]));

        let mut named = ConstraintSet::new(false);
        named.add(VersionConstraint::parse(">=2.0rc1").unwrap());
        assert!(named.allows_prerelease());
        assert_eq!(named.candidates(&available, highest), versions(&["2.0rc1"]));
    }

    #[test]
    fn test_preference_is_respected() {
        let set = ConstraintSet::new(false);
        let available = versions(&["1.0", "3.0", "2.0"]);
        let lowest = set.candidates(&available, |a: &Version, b: &Version| a.cmp(b));
        assert_eq!(lowest, versions(&["1.0", "2.0", "3.0"]));
    }

    #[test]
    fn test_any_constraints_are_ignored() {
        let mut set = ConstraintSet::new(false);
        set.add(VersionConstraint::any());
        assert!(set.is_empty());
    }
}
