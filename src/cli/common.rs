//! Arguments and setup shared by the commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::config::ResolverConfig;
use crate::core::{CancellationSignal, PwiError};
use crate::provider::{CachingProvider, IndexProvider, RetryingProvider};
use crate::requirement::{Requirement, read_requirements_file};
use crate::resolver::{ResolutionOutcome, ResolutionRequest, SelectionStrategy, resolve};
use crate::utils::spinner_with_message;

/// Provider stack used by every command
pub type CliProvider = RetryingProvider<CachingProvider<IndexProvider>>;

/// State shared by every command, fixed before the command runs.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Merged configuration file
    pub config: ResolverConfig,
    /// Whether spinners and progress bars are drawn
    pub show_progress: bool,
    /// Raised on Ctrl-C
    pub cancel: CancellationSignal,
}

/// Output format for machine-readable results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where the root requirements and package metadata come from.
#[derive(Args, Debug, Clone, Default)]
pub struct RequirementArgs {
    /// Requirements such as `flask>=2.0` or `requests[security]~=2.31`
    #[arg(value_name = "REQ")]
    pub requirements: Vec<String>,

    /// Read requirements from a file (repeatable)
    #[arg(short = 'r', long = "requirement", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Package index file (overrides `index` in the configuration)
    #[arg(long, value_name = "PATH")]
    pub index: Option<PathBuf>,
}

impl RequirementArgs {
    /// Parse the command-line requirements, then every requirements file in
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was given, a requirement is malformed, or
    /// a file cannot be read.
    pub fn collect(&self) -> Result<Vec<Requirement>> {
        if self.requirements.is_empty() && self.files.is_empty() {
            anyhow::bail!("No requirements given. Pass requirements as arguments or a file with -r FILE");
        }

        let mut roots = Vec::new();
        for raw in &self.requirements {
            roots.push(Requirement::parse(raw)?);
        }
        for file in &self.files {
            let requirements = read_requirements_file(file)
                .with_context(|| format!("Failed to read requirements from {}", file.display()))?;
            roots.extend(requirements);
        }
        Ok(roots)
    }

    /// The package index to use.
    ///
    /// # Errors
    ///
    /// [`PwiError::ConfigError`] if neither the flag nor the configuration
    /// names one.
    pub fn index_path(&self, config: &ResolverConfig) -> Result<PathBuf, PwiError> {
        self.index.clone().or_else(|| config.index.clone()).ok_or_else(|| PwiError::ConfigError {
            message: "no package index configured; pass --index PATH or set 'index' in the configuration".to_string(),
        })
    }
}

/// Flags that tune resolution; each overrides the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Candidate preference
    #[arg(long, value_enum)]
    pub strategy: Option<SelectionStrategy>,

    /// Consider pre-release versions
    #[arg(long)]
    pub pre: bool,

    /// Give up after this many backtracks
    #[arg(long, value_name = "N")]
    pub max_backtracks: Option<usize>,

    /// Timeout for one metadata lookup, in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl ResolveArgs {
    /// Freeze `roots`, the configuration and these flags into a request.
    #[must_use]
    pub fn request(&self, roots: Vec<Requirement>, config: &ResolverConfig) -> ResolutionRequest {
        let mut options = config.resolve_options();
        if let Some(strategy) = self.strategy {
            options.strategy = strategy;
        }
        if self.pre {
            options.allow_prereleases = true;
        }
        if let Some(max_backtracks) = self.max_backtracks {
            options.max_backtracks = max_backtracks;
        }
        if let Some(secs) = self.timeout {
            options.metadata_timeout = Duration::from_secs(secs);
        }
        ResolutionRequest::new(roots, options)
    }
}

/// A request and the provider to answer it.
pub struct Session {
    pub request: ResolutionRequest,
    pub provider: CliProvider,
}

impl Session {
    /// Collect requirements, load the index and build the request.
    ///
    /// # Errors
    ///
    /// Any error of [`RequirementArgs::collect`], a missing index, or an
    /// index that cannot be loaded.
    pub async fn open(inputs: &RequirementArgs, options: &ResolveArgs, ctx: &CommandContext) -> Result<Self> {
        let roots = inputs.collect()?;
        let index = inputs.index_path(&ctx.config)?;
        let provider = IndexProvider::load(&index)
            .await
            .with_context(|| format!("Failed to load package index {}", index.display()))?;
        tracing::debug!("loaded {} package(s) from {}", provider.len(), index.display());

        Ok(Self {
            request: options.request(roots, &ctx.config),
            provider: RetryingProvider::new(CachingProvider::new(provider))
                .with_retries(ctx.config.metadata_retries),
        })
    }

    /// Resolve with a spinner.
    ///
    /// # Errors
    ///
    /// Any error of [`resolve`].
    pub async fn resolve(&self, ctx: &CommandContext) -> Result<ResolutionOutcome> {
        let spinner = spinner_with_message("Resolving dependencies...", ctx.show_progress);
        let outcome = resolve(&self.request, &self.provider, &ctx.cancel).await;
        spinner.finish_and_clear();
        Ok(outcome?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(requirements: &[&str]) -> RequirementArgs {
        RequirementArgs {
            requirements: requirements.iter().map(ToString::to_string).collect(),
            ..RequirementArgs::default()
        }
    }

    #[test]
    fn test_collect_from_arguments_and_files() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("requirements.txt");
        std::fs::write(&file, "# web\njinja2>=3.0\n").unwrap();

        let inputs = RequirementArgs {
            files: vec![file],
            ..args(&["Flask>=2.0"])
        };
        let roots = inputs.collect().unwrap();
        let names: Vec<&str> = roots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["flask", "jinja2"]);
    }

    #[test]
    fn test_collect_rejects_empty_and_malformed_input() {
        assert!(RequirementArgs::default().collect().is_err());

        let err = args(&["flask>>2"]).collect().unwrap_err();
        assert!(matches!(err.downcast_ref::<PwiError>(), Some(PwiError::MalformedRequirement { .. })));
    }

    #[test]
    fn test_index_flag_overrides_configuration() {
        let config = ResolverConfig {
            index: Some(PathBuf::from("/from/config.toml")),
            ..ResolverConfig::default()
        };
        let flag = RequirementArgs {
            index: Some(PathBuf::from("/from/flag.toml")),
            ..RequirementArgs::default()
        };

        assert_eq!(flag.index_path(&config).unwrap(), PathBuf::from("/from/flag.toml"));
        assert_eq!(RequirementArgs::default().index_path(&config).unwrap(), PathBuf::from("/from/config.toml"));
        assert!(matches!(
            RequirementArgs::default().index_path(&ResolverConfig::default()),
            Err(PwiError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_flags_override_configuration() {
        let config = ResolverConfig {
            max_backtracks: 10,
            strategy: SelectionStrategy::Lowest,
            ..ResolverConfig::default()
        };

        let request = ResolveArgs::default().request(Vec::new(), &config);
        assert_eq!(request.options().max_backtracks, 10);
        assert_eq!(request.options().strategy, SelectionStrategy::Lowest);
        assert!(!request.options().allow_prereleases);

        let flags = ResolveArgs {
            strategy: Some(SelectionStrategy::Highest),
            pre: true,
            max_backtracks: Some(0),
            timeout: Some(3),
        };
        let request = flags.request(Vec::new(), &config);
        assert_eq!(request.options().max_backtracks, 0);
        assert_eq!(request.options().strategy, SelectionStrategy::Highest);
        assert!(request.options().allow_prereleases);
        assert_eq!(request.options().metadata_timeout, Duration::from_secs(3));
    }
}
