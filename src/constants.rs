//! Global constants used throughout the resolver.
//!
//! Timeouts, search bounds and retry parameters that several modules share.
//! Everything here can be overridden through [`crate::config::ResolverConfig`].

use std::time::Duration;

/// Per-query timeout for metadata lookups (30 seconds).
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Total number of unwinds the backtracking search may perform before it
/// reports the requirements as unresolvable.
pub const DEFAULT_MAX_BACKTRACKS: usize = 512;

/// Upper bound on metadata queries in flight during one frontier round.
pub const DEFAULT_MAX_PARALLEL_QUERIES: usize = 8;

/// Retries for a failed metadata lookup before the error is surfaced.
pub const DEFAULT_METADATA_RETRIES: usize = 2;

/// Starting delay for exponential backoff (10ms).
///
/// Doubles on each retry attempt.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Minimum similarity (percent of the longer name) for a "did you mean" hint.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Maximum number of "did you mean" hints.
pub const MAX_SUGGESTIONS: usize = 3;

/// Directory under the home directory holding the user configuration.
pub const CONFIG_DIR_NAME: &str = ".pwi";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "PWI_CONFIG";
