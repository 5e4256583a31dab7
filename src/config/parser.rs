//! Generic configuration parsing.
//!
//! ```rust,no_run
//! use pwi_cli::config::parse_config;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct Limits {
//!     max_backtracks: usize,
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let limits: Limits = parse_config(Path::new("limits.toml"))?;
//! println!("{}", limits.max_backtracks);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML file into `T`.
///
/// # Errors
///
/// Returns an error naming `path` if the file cannot be read or does not
/// match `T`.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Limits {
        max_backtracks: usize,
        strategy: String,
    }

    #[test]
    fn test_parse_config() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("limits.toml");
        std::fs::write(&path, "max_backtracks = 64\nstrategy = \"lowest\"\n").unwrap();

        let limits: Limits = parse_config(&path).unwrap();
        assert_eq!(limits.max_backtracks, 64);
        assert_eq!(limits.strategy, "lowest");
    }

    #[test]
    fn test_parse_config_errors_name_the_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "max_backtracks = {").unwrap();

        let err = parse_config::<Limits>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));

        let err = parse_config::<Limits>(&temp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
