//! Candidate ordering.
//!
//! The resolver tries a package's candidate versions in preference order.
//! The default prefers the highest version; [`SelectionStrategy::Lowest`]
//! is useful for checking that declared lower bounds actually work. Any
//! comparator closure can be plugged in through [`CandidateOrdering`].

use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Orders candidate versions; `Ordering::Less` means `a` is tried before `b`.
///
/// Implementations must be total orders, or resolution is not deterministic.
pub trait CandidateOrdering: Send + Sync {
    /// Compare two candidates of the same package
    fn compare(&self, a: &Version, b: &Version) -> Ordering;
}

impl<F> CandidateOrdering for F
where
    F: Fn(&Version, &Version) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        self(a, b)
    }
}

/// Built-in orderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Newest version first
    #[default]
    Highest,
    /// Oldest version first
    Lowest,
}

impl CandidateOrdering for SelectionStrategy {
    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        match self {
            Self::Highest => b.cmp(a),
            Self::Lowest => a.cmp(b),
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest => f.write_str("highest"),
            Self::Lowest => f.write_str("lowest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_orderings() {
        let mut versions = vec![Version::new(1, 0, 0), Version::new(3, 0, 0), Version::new(2, 0, 0)];

        versions.sort_by(|a, b| SelectionStrategy::Highest.compare(a, b));
        assert_eq!(versions[0], Version::new(3, 0, 0));

        versions.sort_by(|a, b| SelectionStrategy::Lowest.compare(a, b));
        assert_eq!(versions[0], Version::new(1, 0, 0));
    }

    #[test]
    fn test_closure_ordering() {
        // Prefer 2.x, then highest
        let prefer_two = |a: &Version, b: &Version| {
            (a.major() != 2).cmp(&(b.major() != 2)).then_with(|| b.cmp(a))
        };
        let mut versions = vec![Version::new(1, 0, 0), Version::new(3, 0, 0), Version::new(2, 1, 0)];
        versions.sort_by(|a, b| prefer_two.compare(a, b));
        assert_eq!(versions, vec![Version::new(2, 1, 0), Version::new(3, 0, 0), Version::new(1, 0, 0)]);
    }

    #[test]
    fn test_strategy_serde() {
        let parsed: SelectionStrategy = serde_json::from_str("\"lowest\"").unwrap();
        assert_eq!(parsed, SelectionStrategy::Lowest);
        assert_eq!(SelectionStrategy::default().to_string(), "highest");
    }
}
