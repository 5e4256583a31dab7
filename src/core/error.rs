//! Error handling for the resolver and installer.
//!
//! The library layer returns [`PwiError`] from every fallible operation so that
//! callers can match on the failure kind (a malformed requirement is a user
//! mistake, an unavailable index is an environment problem, an unresolvable
//! set is a property of the requirements). The CLI layer wraps these in
//! [`anyhow::Error`] and turns them into an [`ErrorContext`] right before
//! printing, adding a suggestion and details where we know something useful.
//!
//! # Error Categories
//!
//! - **Input**: [`PwiError::MalformedRequirement`], [`PwiError::InvalidVersion`]
//! - **Metadata**: [`PwiError::MetadataUnavailable`]
//! - **Resolution**: [`PwiError::Unresolvable`], [`PwiError::CyclicDependency`]
//! - **Installation**: [`PwiError::InstallFailed`], [`PwiError::RollbackFailed`]
//! - **Control flow**: [`PwiError::OperationCancelled`]
//! - **Plumbing**: IO, TOML, JSON and configuration errors
//!
//! # Examples
//!
//! ```rust,no_run
//! use pwi_cli::core::{PwiError, user_friendly_error};
//!
//! let error = PwiError::MetadataUnavailable {
//!     package: "flaks".to_string(),
//!     reason: "package not found in index".to_string(),
//!     suggestions: vec!["flask".to_string()],
//! };
//! user_friendly_error(anyhow::Error::from(error)).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::version::conflict::ConflictReport;

/// The main error type for resolution, planning and installation.
#[derive(Error, Debug)]
pub enum PwiError {
    /// A requirement string could not be parsed.
    ///
    /// `input` holds the offending text; for requirement files `reason` is
    /// prefixed with `file:line`.
    #[error("Malformed requirement '{input}': {reason}")]
    MalformedRequirement {
        /// The text that failed to parse
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// A version string could not be parsed
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion {
        /// The text that failed to parse
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// The metadata provider could not answer for a required package.
    ///
    /// Covers unknown names, lookups that timed out, and transport failures.
    #[error("Package metadata unavailable for '{package}': {reason}")]
    MetadataUnavailable {
        /// Normalized package name
        package: String,
        /// Provider-supplied failure reason
        reason: String,
        /// Similar package names the provider does know about
        suggestions: Vec<String>,
    },

    /// No assignment of versions satisfies every constraint.
    #[error("Cannot resolve dependencies: {} conflicting package(s) after {backtracks} backtrack(s)", conflicts.len())]
    Unresolvable {
        /// One report per package that could not be satisfied, sorted by name
        conflicts: Vec<ConflictReport>,
        /// How many times the search unwound before giving up
        backtracks: usize,
    },

    /// The resolved packages contain a dependency cycle and cannot be ordered.
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CyclicDependency {
        /// Package names along the cycle, first name repeated at the end
        chain: Vec<String>,
    },

    /// A cancellation signal was observed.
    #[error("Operation cancelled")]
    OperationCancelled,

    /// Installing one plan entry failed and the environment was restored.
    #[error("Failed to install '{package}': {reason}")]
    InstallFailed {
        /// The `name==version` pin that failed
        package: String,
        /// Installer output or error
        reason: String,
    },

    /// Installing failed and restoring the snapshot failed as well.
    #[error("Failed to install '{package}' and could not restore the previous environment: {reason}")]
    RollbackFailed {
        /// The `name==version` pin that failed
        package: String,
        /// Why the install failed
        install_error: String,
        /// Why the restore failed
        reason: String,
    },

    /// Configuration file or setting is invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl PwiError {
    /// Whether retrying the same operation might succeed.
    ///
    /// Only metadata lookups are retried, and only when the failure does not
    /// look like a definitive "no such package" answer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MetadataUnavailable {
                suggestions,
                reason,
                ..
            } => suggestions.is_empty() && !reason.contains("not found"),
            _ => false,
        }
    }

    /// Shorthand for a metadata failure without suggestions
    pub fn metadata_unavailable(package: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::MetadataUnavailable {
            package: package.to_string(),
            reason: reason.into(),
            suggestions: Vec::new(),
        }
    }
}

impl Clone for PwiError {
    fn clone(&self) -> Self {
        match self {
            Self::MalformedRequirement {
                input,
                reason,
            } => Self::MalformedRequirement {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::InvalidVersion {
                input,
                reason,
            } => Self::InvalidVersion {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::MetadataUnavailable {
                package,
                reason,
                suggestions,
            } => Self::MetadataUnavailable {
                package: package.clone(),
                reason: reason.clone(),
                suggestions: suggestions.clone(),
            },
            Self::Unresolvable {
                conflicts,
                backtracks,
            } => Self::Unresolvable {
                conflicts: conflicts.clone(),
                backtracks: *backtracks,
            },
            Self::CyclicDependency {
                chain,
            } => Self::CyclicDependency {
                chain: chain.clone(),
            },
            Self::OperationCancelled => Self::OperationCancelled,
            Self::InstallFailed {
                package,
                reason,
            } => Self::InstallFailed {
                package: package.clone(),
                reason: reason.clone(),
            },
            Self::RollbackFailed {
                package,
                install_error,
                reason,
            } => Self::RollbackFailed {
                package: package.clone(),
                install_error: install_error.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error and the parser errors are not Clone; keep the message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A [`PwiError`] together with what the user can do about it.
///
/// Built by [`user_friendly_error`] at the CLI boundary and printed with
/// [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PwiError,
    /// Actionable next step, printed in green
    pub suggestion: Option<String>,
    /// Extra explanation, printed in yellow
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details
    #[must_use]
    pub const fn new(error: PwiError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for the terminal.
///
/// Recognizes [`PwiError`] anywhere in the chain, plain IO errors and TOML
/// errors; everything else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for (depth, cause) in error.chain().enumerate() {
        if let Some(pwi_error) = cause.downcast_ref::<PwiError>() {
            let context = create_error_context(pwi_error.clone());
            if depth > 0 {
                // Outer context (e.g. "while reading requirements.txt") is worth keeping
                let outer = error.to_string();
                return match context.details {
                    Some(details) => ErrorContext {
                        details: Some(format!("{outer}\n{details}")),
                        ..context
                    },
                    None => context.with_details(outer),
                };
            }
            return context;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(PwiError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check file permissions or run inside a virtual environment you own");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(PwiError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(PwiError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax. Verify quotes, brackets, and table headers");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(PwiError::Other {
        message,
    })
}

fn create_error_context(error: PwiError) -> ErrorContext {
    match &error {
        PwiError::MalformedRequirement {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use the form 'name[extra1,extra2] >=1.0,<2.0 ; marker', e.g. 'flask>=2.0' or 'requests[security]~=2.31'")
            .with_details("Supported operators: ==, !=, >=, <=, >, <, ~=. Wildcards are allowed with == and != (e.g. '==1.2.*')"),

        PwiError::InvalidVersion {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Versions have one to three numeric segments with an optional pre-release, e.g. '2.0', '1.4.2', '3.0.0rc1'"),

        PwiError::MetadataUnavailable {
            package,
            reason,
            suggestions,
        } => {
            let suggestion = if suggestions.is_empty() {
                if reason.contains("timed out") {
                    "The package index did not answer in time. Retry, or raise the limit with --timeout".to_string()
                } else {
                    format!("Check that '{package}' is spelled correctly and exists in the configured index")
                }
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        PwiError::Unresolvable {
            conflicts,
            ..
        } => {
            let details = conflicts.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n");
            ErrorContext::new(error.clone())
                .with_details(details)
                .with_suggestion("Relax or remove one of the conflicting requirements, or run 'pwi resolve --dry-run' to see every conflict")
        }

        PwiError::CyclicDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Packages in a cycle cannot be installed one after another; break the cycle in the package metadata or pin a version that does not have it")
            .with_details("Use 'pwi cycles' to list every cycle in the dependency graph"),

        PwiError::OperationCancelled => ErrorContext::new(error)
            .with_details("No packages were changed after the cancellation was observed"),

        PwiError::InstallFailed {
            ..
        } => ErrorContext::new(error)
            .with_details("The environment was restored to the state before installation started")
            .with_suggestion("Re-run with --verbose to see the installer output"),

        PwiError::RollbackFailed {
            install_error,
            ..
        } => {
            let details = format!("Install error: {install_error}");
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("The environment may be partially modified. Recreate the virtual environment before retrying")
        }

        PwiError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check ~/.pwi/config.toml or the file passed with --config"),

        _ => ErrorContext::new(error),
    }
}
