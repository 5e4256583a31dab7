//! Version constraint parsing and matching.
//!
//! A [`VersionConstraint`] is a conjunction of comparison [`Clause`]s such as
//! `>=2.0,<3.0`. Every clause must hold for a version to match. The empty
//! constraint (no clauses) matches every version and is written `*`.
//!
//! # Operators
//!
//! | Operator | Meaning |
//! |----------|---------|
//! | `==V`    | exactly `V`; `==1.2.*` matches any `1.2.x` |
//! | `!=V`    | anything but `V`; `!=1.2.*` excludes every `1.2.x` |
//! | `>=`, `<=`, `>`, `<` | ordered comparison |
//! | `~=V`    | compatible release: `>=V` and same release prefix minus the last segment |
//!
//! `~=2.2` is `>=2.2,==2.*` and `~=1.4.5` is `>=1.4.5,==1.4.*`. A one-segment
//! `~=` is rejected.
//!
//! # Examples
//!
//! ```rust
//! use pwi_cli::version::Version;
//! use pwi_cli::version::constraints::VersionConstraint;
//!
//! let constraint = VersionConstraint::parse(">=2.0, <3.0, !=2.0.1")?;
//! assert!(constraint.matches(&Version::parse("2.3.0")?));
//! assert!(!constraint.matches(&Version::parse("2.0.1")?));
//! assert_eq!(constraint.to_string(), ">=2.0,<3.0,!=2.0.1");
//! # Ok::<(), pwi_cli::core::PwiError>(())
//! ```

mod constraint_set;


pub use constraint_set::ConstraintSet;

use std::fmt;

use serde::{Serialize, Serializer};

use super::Version;
use crate::core::PwiError;

/// Comparison operator of a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `~=`
    Compatible,
}

impl Operator {
    /// Operators in the order they must be tried when scanning input, so that
    /// two-character operators win over their one-character prefixes.
    const SCAN_ORDER: [(&'static str, Self); 7] = [
        ("~=", Self::Compatible),
        ("==", Self::Eq),
        ("!=", Self::Ne),
        (">=", Self::Ge),
        ("<=", Self::Le),
        (">", Self::Gt),
        ("<", Self::Lt),
    ];

    /// The operator's textual form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Compatible => "~=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `operator version` comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    /// Comparison operator
    pub op: Operator,
    /// Right-hand side
    pub version: Version,
    /// `.*` suffix; only valid with `==` and `!=`
    pub wildcard: bool,
}

impl Clause {
    /// Parse a single clause such as `>= 2.0` or `==1.4.*`.
    pub fn parse(input: &str) -> Result<Self, PwiError> {
        let malformed = |reason: String| PwiError::MalformedRequirement {
            input: input.to_string(),
            reason,
        };

        let text = input.trim();
        if text.starts_with("===") {
            return Err(malformed("arbitrary equality (===) is not supported".to_string()));
        }

        let (op, rest) = Operator::SCAN_ORDER
            .iter()
            .find_map(|(token, op)| text.strip_prefix(token).map(|rest| (*op, rest.trim())))
            .ok_or_else(|| {
                malformed("expected a comparison operator (==, !=, >=, <=, >, <, ~=)".to_string())
            })?;

        if rest.is_empty() {
            return Err(malformed(format!("missing version after '{op}'")));
        }

        let (version_text, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };
        if wildcard && !matches!(op, Operator::Eq | Operator::Ne) {
            return Err(malformed(format!("wildcard versions are only allowed with == and !=, not '{op}'")));
        }

        let version = Version::parse(version_text).map_err(|e| match e {
            PwiError::InvalidVersion {
                reason,
                ..
            } => malformed(format!("invalid version '{version_text}': {reason}")),
            other => other,
        })?;

        if wildcard && version.is_prerelease() {
            return Err(malformed("a wildcard cannot follow a pre-release".to_string()));
        }
        if op == Operator::Compatible && version.segments() < 2 {
            return Err(malformed(format!("'~={version}' needs at least two release segments")));
        }

        Ok(Self {
            op,
            version,
            wildcard,
        })
    }

    /// Whether `candidate` satisfies this clause.
    #[must_use]
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Operator::Eq if self.wildcard => self.prefix_matches(candidate, self.version.segments()),
            Operator::Ne if self.wildcard => !self.prefix_matches(candidate, self.version.segments()),
            Operator::Eq => candidate == &self.version,
            Operator::Ne => candidate != &self.version,
            Operator::Ge => candidate >= &self.version,
            Operator::Le => candidate <= &self.version,
            Operator::Gt => candidate > &self.version,
            Operator::Lt => candidate < &self.version,
            Operator::Compatible => {
                candidate >= &self.version
                    && self.prefix_matches(candidate, self.version.segments() - 1)
            }
        }
    }

    fn prefix_matches(&self, candidate: &Version, segments: usize) -> bool {
        candidate.release_prefix_matches(&self.version, segments)
    }

    /// Whether this clause names a pre-release explicitly.
    #[must_use]
    pub fn mentions_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

/// A conjunction of [`Clause`]s.
///
/// Clauses keep the order they were written in; exact duplicates are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionConstraint {
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    /// The constraint that matches every version.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Parse a comma-separated clause list.
    ///
    /// Empty input and `*` yield [`VersionConstraint::any`].
    ///
    /// # Errors
    ///
    /// [`PwiError::MalformedRequirement`] with `input` set to the whole
    /// constraint text.
    pub fn parse(input: &str) -> Result<Self, PwiError> {
        let text = input.trim();
        if text.is_empty() || text == "*" {
            return Ok(Self::any());
        }

        let mut constraint = Self::any();
        for part in text.split(',') {
            if part.trim().is_empty() {
                return Err(PwiError::MalformedRequirement {
                    input: input.to_string(),
                    reason: "empty clause between commas".to_string(),
                });
            }
            let clause = Clause::parse(part).map_err(|e| match e {
                PwiError::MalformedRequirement {
                    reason,
                    ..
                } => PwiError::MalformedRequirement {
                    input: input.to_string(),
                    reason,
                },
                other => other,
            })?;
            constraint.push(clause);
        }
        Ok(constraint)
    }

    fn push(&mut self, clause: Clause) {
        if !self.clauses.contains(&clause) {
            self.clauses.push(clause);
        }
    }

    /// The constraint satisfied exactly when both `self` and `other` are.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for clause in &other.clauses {
            merged.push(clause.clone());
        }
        merged
    }

    /// Whether `version` satisfies every clause.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }

    /// Whether this constraint matches every version.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether any clause names a pre-release, which opts the constrained
    /// package into pre-release candidates.
    #[must_use]
    pub fn mentions_prerelease(&self) -> bool {
        self.clauses.iter().any(Clause::mentions_prerelease)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
