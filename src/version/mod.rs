//! Package versions, version constraints and constraint conflicts.
//!
//! # Module Organization
//!
//! - [`Version`] (this module) - a totally ordered release number
//! - [`constraints`] - clause parsing ([`constraints::VersionConstraint`]) and
//!   constraint sets ([`constraints::ConstraintSet`])
//! - [`conflict`] - [`conflict::ConflictDetector`] and the
//!   [`conflict::ConflictReport`] diagnostics shared with the resolver
//!
//! # Version Syntax
//!
//! Index versions come in the shapes Python packages actually publish, so
//! parsing is lenient where it is unambiguous:
//!
//! - one to three numeric release segments: `2`, `2.0`, `2.0.3`
//! - an optional leading `v`: `v1.4.0`
//! - pre-releases in either spelling: `3.0.0rc1`, `3.0.0-rc.1`, `1.0b2`,
//!   `1.0.0.dev3`, `1.0.0-beta`
//!
//! Missing segments are zero for comparison purposes, so `2.0` and `2.0.0`
//! are the same version. The number of segments written is remembered and
//! used when the version is printed and by `~=` and `==X.*` clauses.
//!
//! Pre-releases order before the release they precede, and among themselves
//! as `dev < a < b < rc`.
//!
//! # Examples
//!
//! ```rust
//! use pwi_cli::version::Version;
//!
//! let rc: Version = "3.0.0rc1".parse()?;
//! let release: Version = "3.0".parse()?;
//! assert!(rc < release);
//! assert!(rc.is_prerelease());
//! assert_eq!(release.to_string(), "3.0");
//! # Ok::<(), pwi_cli::core::PwiError>(())
//! ```

pub mod conflict;
pub mod constraints;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::PwiError;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?
        (?:
            [-_.]?(?P<label>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<num>\d+)?
          | [-_.]?(?P<dev>dev)[-_.]?(?P<devnum>\d+)?
          | -(?P<tag>[0-9a-z-]+(?:\.[0-9a-z-]+)*)
        )?$",
    )
    .expect("version pattern is a valid regex")
});

/// A package version.
///
/// Equality, ordering and hashing ignore how many release segments were
/// written; only the numeric value and pre-release matter.
#[derive(Debug, Clone)]
pub struct Version {
    inner: semver::Version,
    segments: u8,
}

impl Version {
    /// A three-segment release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            inner: semver::Version::new(major, minor, patch),
            segments: 3,
        }
    }

    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`PwiError::InvalidVersion`] for empty input, more than three
    /// release segments, build metadata, or an unrecognized pre-release tag.
    pub fn parse(input: &str) -> Result<Self, PwiError> {
        let invalid = |reason: &str| PwiError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim().to_ascii_lowercase();
        let text = text.strip_prefix('v').unwrap_or(&text);
        if text.is_empty() {
            return Err(invalid("empty version"));
        }
        if text.contains('+') {
            return Err(invalid("build metadata is not supported"));
        }

        let caps = VERSION_PATTERN.captures(text).ok_or_else(|| {
            invalid("expected one to three numeric segments and an optional pre-release")
        })?;

        let segment = |name: &str| -> Result<Option<u64>, PwiError> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid("release segment is too large")))
                .transpose()
        };
        let major = segment("major")?.unwrap_or(0);
        let minor = segment("minor")?;
        let patch = segment("patch")?;
        let segments = 1 + u8::from(minor.is_some()) + u8::from(patch.is_some());

        let pre = if let Some(label) = caps.name("label") {
            let label = match label.as_str() {
                "a" | "alpha" => "alpha",
                "b" | "beta" => "beta",
                _ => "rc",
            };
            let num = segment("num")?.unwrap_or(0);
            format!("{label}.{num}")
        } else if caps.name("dev").is_some() {
            // Numeric identifiers sort below alphanumeric ones, so dev < alpha
            format!("0.dev.{}", segment("devnum")?.unwrap_or(0))
        } else if let Some(tag) = caps.name("tag") {
            tag.as_str().to_string()
        } else {
            String::new()
        };

        let mut inner = semver::Version::new(major, minor.unwrap_or(0), patch.unwrap_or(0));
        if !pre.is_empty() {
            inner.pre = semver::Prerelease::new(&pre).map_err(|e| invalid(&e.to_string()))?;
        }

        Ok(Self {
            inner,
            segments,
        })
    }

    /// Major release number
    #[must_use]
    pub fn major(&self) -> u64 {
        self.inner.major
    }

    /// The release numbers as `[major, minor, patch]`.
    #[must_use]
    pub fn release(&self) -> [u64; 3] {
        [self.inner.major, self.inner.minor, self.inner.patch]
    }

    /// How many release segments were written (1 to 3).
    #[must_use]
    pub const fn segments(&self) -> usize {
        self.segments as usize
    }

    /// Whether this is a pre-release (`rc`, `a`, `b`, `dev`, or a `-tag`).
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    /// Whether the first `n` release segments equal those of `other`.
    #[must_use]
    pub fn release_prefix_matches(&self, other: &Self, n: usize) -> bool {
        self.release().iter().zip(other.release().iter()).take(n).all(|(a, b)| a == b)
    }
}

impl FromStr for Version {
    type Err = PwiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.major)?;
        if self.segments >= 2 {
            write!(f, ".{}", self.inner.minor)?;
        }
        if self.segments >= 3 {
            write!(f, ".{}", self.inner.patch)?;
        }

        let pre = self.inner.pre.as_str();
        if pre.is_empty() {
            return Ok(());
        }
        let pep440 = [("alpha.", "a"), ("beta.", "b"), ("rc.", "rc"), ("0.dev.", ".dev")]
            .iter()
            .find_map(|(prefix, short)| {
                pre.strip_prefix(prefix)
                    .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                    .map(|n| format!("{short}{n}"))
            });
        match pep440 {
            Some(short) => write!(f, "{short}"),
            None => write!(f, "-{pre}"),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
