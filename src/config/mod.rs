//! User configuration for pwi.
//!
//! Settings are layered: built-in defaults, then the configuration file, then
//! command-line flags. The CLI merges the layers once and freezes the result
//! into a [`ResolutionRequest`](crate::resolver::ResolutionRequest); the
//! resolver itself never reads configuration.
//!
//! # Location
//!
//! The first of these that applies is used:
//!
//! 1. `--config <path>`
//! 2. the `PWI_CONFIG` environment variable
//! 3. `~/.pwi/config.toml` (Windows: `%LOCALAPPDATA%\pwi\config.toml`)
//!
//! An explicitly named file must exist. A missing default file means
//! defaults.
//!
//! # Format
//!
//! ```toml
//! index = "~/indexes/web.toml"
//! metadata_timeout_secs = 30
//! max_backtracks = 512
//! strategy = "highest"          # or "lowest"
//! allow_prereleases = false
//! max_parallel_queries = 8
//! metadata_retries = 2
//! pip = "/usr/local/bin/pip"
//! venv = "~/.venvs/app"
//! ```
//!
//! Every key is optional. Paths starting with `~` are expanded.

mod parser;

pub use parser::parse_config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_MAX_BACKTRACKS, DEFAULT_MAX_PARALLEL_QUERIES, DEFAULT_METADATA_RETRIES,
    DEFAULT_METADATA_TIMEOUT,
};
use crate::core::PwiError;
use crate::resolver::{ResolveOptions, SelectionStrategy};

/// Settings read from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Package index file
    pub index: Option<PathBuf>,
    /// Timeout for one metadata lookup, in seconds
    pub metadata_timeout_secs: u64,
    /// Total number of unwinds before giving up
    pub max_backtracks: usize,
    /// Candidate preference
    pub strategy: SelectionStrategy,
    /// Consider pre-releases everywhere
    pub allow_prereleases: bool,
    /// Metadata lookups in flight at once
    pub max_parallel_queries: usize,
    /// Retries for a failed metadata lookup
    pub metadata_retries: usize,
    /// pip executable used by `install`
    pub pip: Option<PathBuf>,
    /// Virtual environment used by `install`
    pub venv: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            index: None,
            metadata_timeout_secs: DEFAULT_METADATA_TIMEOUT.as_secs(),
            max_backtracks: DEFAULT_MAX_BACKTRACKS,
            strategy: SelectionStrategy::default(),
            allow_prereleases: false,
            max_parallel_queries: DEFAULT_MAX_PARALLEL_QUERIES,
            metadata_retries: DEFAULT_METADATA_RETRIES,
            pip: None,
            venv: None,
        }
    }
}

impl ResolverConfig {
    /// Load the configuration.
    ///
    /// `explicit` is the `--config` flag and `env_value` the value of
    /// `PWI_CONFIG`, if set. Both name files that must exist; otherwise the
    /// default location is tried and a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a named file is missing, a file cannot be parsed,
    /// or a value is out of range.
    pub fn load(explicit: Option<&Path>, env_value: Option<&str>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_value.filter(|v| !v.trim().is_empty()).map(expand_path));

        let config = match named {
            Some(path) => {
                if !path.exists() {
                    return Err(PwiError::ConfigError {
                        message: format!("configuration file {} does not exist", path.display()),
                    }
                    .into());
                }
                Self::load_from(&path)?
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    tracing::debug!("no configuration at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        Ok(config)
    }

    /// Load and validate one configuration file, expanding `~` in paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// out of range.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Self = parse_config(path)?;
        config.index = config.index.as_deref().map(expand_pathbuf);
        config.pip = config.pip.as_deref().map(expand_pathbuf);
        config.venv = config.venv.as_deref().map(expand_pathbuf);
        config.validate().with_context(|| format!("Invalid configuration in {}", path.display()))?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default configuration location for this platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("pwi")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(CONFIG_DIR_NAME)
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Reject values the resolver cannot work with.
    ///
    /// # Errors
    ///
    /// [`PwiError::ConfigError`] naming the offending key.
    pub fn validate(&self) -> Result<(), PwiError> {
        let zero = |key: &str| PwiError::ConfigError {
            message: format!("'{key}' must be greater than zero"),
        };
        if self.metadata_timeout_secs == 0 {
            return Err(zero("metadata_timeout_secs"));
        }
        if self.max_parallel_queries == 0 {
            return Err(zero("max_parallel_queries"));
        }
        Ok(())
    }

    /// Resolution options described by this configuration
    #[must_use]
    pub const fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            metadata_timeout: Duration::from_secs(self.metadata_timeout_secs),
            max_backtracks: self.max_backtracks,
            strategy: self.strategy,
            allow_prereleases: self.allow_prereleases,
            max_parallel_queries: self.max_parallel_queries,
        }
    }
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn expand_pathbuf(path: &Path) -> PathBuf {
    path.to_str().map_or_else(|| path.to_path_buf(), expand_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(
            temp.path(),
            "config.toml",
            r#"
index = "/srv/index.toml"
metadata_timeout_secs = 5
max_backtracks = 16
strategy = "lowest"
allow_prereleases = true
max_parallel_queries = 2
metadata_retries = 0
pip = "/opt/pip"
venv = "/srv/venv"
"#,
        );

        let config = ResolverConfig::load(Some(&path), None).unwrap();
        assert_eq!(config.index, Some(PathBuf::from("/srv/index.toml")));
        assert_eq!(config.metadata_retries, 0);
        assert_eq!(config.venv, Some(PathBuf::from("/srv/venv")));

        let options = config.resolve_options();
        assert_eq!(options.metadata_timeout, Duration::from_secs(5));
        assert_eq!(options.max_backtracks, 16);
        assert_eq!(options.strategy, SelectionStrategy::Lowest);
        assert!(options.allow_prereleases);
        assert_eq!(options.max_parallel_queries, 2);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "config.toml", "max_backtracks = 3\n");

        let config = ResolverConfig::load_from(&path).unwrap();
        assert_eq!(
            config,
            ResolverConfig {
                max_backtracks: 3,
                ..ResolverConfig::default()
            }
        );
        assert_eq!(ResolverConfig::default().resolve_options(), ResolveOptions::default());
    }

    #[test]
    fn test_explicit_path_wins_over_environment() {
        let temp = tempfile::tempdir().unwrap();
        let explicit = write(temp.path(), "explicit.toml", "max_backtracks = 1\n");
        let from_env = write(temp.path(), "env.toml", "max_backtracks = 2\n");
        let env_value = from_env.to_str().unwrap();

        assert_eq!(ResolverConfig::load(Some(&explicit), Some(env_value)).unwrap().max_backtracks, 1);
        assert_eq!(ResolverConfig::load(None, Some(env_value)).unwrap().max_backtracks, 2);
    }

    #[test]
    fn test_named_file_must_exist() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.toml");

        let err = ResolverConfig::load(Some(&missing), None).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(ResolverConfig::load(None, Some(missing.to_str().unwrap())).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let unknown = write(temp.path(), "unknown.toml", "max_backtrack = 3\n");
        assert!(ResolverConfig::load_from(&unknown).is_err());

        let zero = write(temp.path(), "zero.toml", "max_parallel_queries = 0\n");
        let err = ResolverConfig::load_from(&zero).unwrap_err();
        assert!(format!("{err:#}").contains("max_parallel_queries"));

        let strategy = write(temp.path(), "strategy.toml", "strategy = \"newest\"\n");
        assert!(ResolverConfig::load_from(&strategy).is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "config.toml", "index = \"~/index.toml\"\n");

        let config = ResolverConfig::load_from(&path).unwrap();
        let index = config.index.unwrap();
        assert!(!index.starts_with("~"));
        assert!(index.ends_with("index.toml"));
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_default_path() {
        let path = ResolverConfig::default_path().unwrap();
        assert!(path.ends_with("config.toml"));
    }
}
