//! Requirement parsing.
//!
//! A requirement names a package, optionally some extras, a version
//! constraint, and an environment marker:
//!
//! ```text
//! requests[security,socks] >=2.31,<3 ; python_version >= "3.8"
//! ```
//!
//! Names are normalized the way package indexes compare them: lowercase,
//! with runs of `-`, `_` and `.` collapsed to a single `-`. Markers are kept
//! verbatim and never evaluated. Direct references (`name @ url`) are
//! rejected.
//!
//! [`file`] reads whole requirements files (comments, line continuations,
//! nested `-r` includes) and renders pinned output.
//!
//! # Examples
//!
//! ```rust
//! use pwi_cli::requirement::Requirement;
//!
//! let req = Requirement::parse("Flask_Login[Extra] ~=0.6.2")?;
//! assert_eq!(req.name.as_str(), "flask-login");
//! assert!(req.extras.contains("extra"));
//! assert_eq!(req.to_string(), "flask-login[extra]~=0.6.2");
//! # Ok::<(), pwi_cli::core::PwiError>(())
//! ```

pub mod file;

pub use file::{parse_requirements, read_requirements_file};


use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::PwiError;
use crate::version::Version;
use crate::version::constraints::VersionConstraint;

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Normalize `name` without validating it.
    ///
    /// Use [`PackageName::parse`] for untrusted input.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut normalized = String::with_capacity(name.len());
        let mut pending_separator = false;
        for c in name.trim().chars() {
            if matches!(c, '-' | '_' | '.') {
                pending_separator = true;
                continue;
            }
            if pending_separator && !normalized.is_empty() {
                normalized.push('-');
            }
            pending_separator = false;
            normalized.push(c.to_ascii_lowercase());
        }
        Self(normalized)
    }

    /// Validate and normalize a package name.
    ///
    /// Names start and end with an ASCII letter or digit and otherwise
    /// contain only letters, digits, `-`, `_` and `.`.
    pub fn parse(name: &str) -> Result<Self, PwiError> {
        let trimmed = name.trim();
        if is_valid_name(trimmed) {
            Ok(Self::new(trimmed))
        } else {
            Err(PwiError::MalformedRequirement {
                input: name.to_string(),
                reason: "invalid package name".to_string(),
            })
        }
    }

    /// The normalized name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn is_valid_name(name: &str) -> bool {
    let (Some(first), Some(last)) = (name.chars().next(), name.chars().last()) else {
        return false;
    };
    first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric() && name.chars().all(is_name_char)
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Where a requirement came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Requester {
    /// The user's requirement list
    Root,
    /// A specific version of another package
    Package {
        /// Requiring package
        name: PackageName,
        /// Requiring version
        version: Version,
    },
}

impl Requester {
    /// A package-version requester
    #[must_use]
    pub fn package(name: PackageName, version: Version) -> Self {
        Self::Package {
            name,
            version,
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root requirements"),
            Self::Package {
                name,
                version,
            } => write!(f, "{name} {version}"),
        }
    }
}

impl Serialize for Requester {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A parsed requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    /// Normalized package name
    pub name: PackageName,
    /// Version constraint; [`VersionConstraint::any`] when none was given
    pub constraint: VersionConstraint,
    /// Requested extras, normalized like package names
    pub extras: BTreeSet<String>,
    /// Environment marker text after `;`, kept verbatim
    pub marker: Option<String>,
    /// Who declared this requirement
    pub source: Requester,
}

impl Requirement {
    /// Parse a requirement string; the result's source is [`Requester::Root`].
    ///
    /// # Errors
    ///
    /// [`PwiError::MalformedRequirement`] with `input` set to `raw`.
    pub fn parse(raw: &str) -> Result<Self, PwiError> {
        let malformed = |reason: String| PwiError::MalformedRequirement {
            input: raw.to_string(),
            reason,
        };

        let (body, marker) = match raw.split_once(';') {
            Some((body, marker)) => {
                let marker = marker.trim();
                if marker.is_empty() {
                    return Err(malformed("empty environment marker after ';'".to_string()));
                }
                (body.trim(), Some(marker.to_string()))
            }
            None => (raw.trim(), None),
        };
        if body.is_empty() {
            return Err(malformed("empty requirement".to_string()));
        }

        let name_end = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
        let name_text = &body[..name_end];
        if !is_valid_name(name_text) {
            return Err(malformed("expected a package name at the start".to_string()));
        }
        let name = PackageName::new(name_text);

        let mut rest = body[name_end..].trim_start();
        let mut extras = BTreeSet::new();
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let (list, after) = after_bracket
                .split_once(']')
                .ok_or_else(|| malformed("unterminated extras list, expected ']'".to_string()))?;
            for extra in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if !is_valid_name(extra) {
                    return Err(malformed(format!("invalid extra name '{extra}'")));
                }
                extras.insert(PackageName::new(extra).0);
            }
            rest = after.trim_start();
        }

        if rest.starts_with('@') {
            return Err(malformed("direct references (name @ url) are not supported".to_string()));
        }

        let constraint_text = match rest.strip_prefix('(') {
            Some(inner) => inner
                .strip_suffix(')')
                .ok_or_else(|| malformed("unbalanced parenthesis around version constraint".to_string()))?,
            None => rest,
        };
        if constraint_text.trim() == "*" {
            return Err(malformed("'*' is not a version constraint; omit it to accept any version".to_string()));
        }

        let constraint = VersionConstraint::parse(constraint_text).map_err(|e| match e {
            PwiError::MalformedRequirement {
                reason,
                ..
            } => malformed(reason),
            other => other,
        })?;

        Ok(Self {
            name,
            constraint,
            extras,
            marker,
            source: Requester::Root,
        })
    }

    /// The same requirement attributed to `source`.
    #[must_use]
    pub fn with_source(mut self, source: Requester) -> Self {
        self.source = source;
        self
    }
}

impl FromStr for Requirement {
    type Err = PwiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        if !self.constraint.is_any() {
            write!(f, "{}", self.constraint)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}
