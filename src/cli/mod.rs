//! Command-line interface for pwi.
//!
//! # Commands
//!
//! - `resolve` - resolve requirements and print (or write) the plan
//! - `install` - resolve, then install the plan with pip under a rollback guard
//! - `tree` - show the resolved dependency tree
//! - `why` - show the shortest requirement chain between two packages
//! - `cycles` - list circular dependency declarations
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` select the log level (`debug` / `error`, default
//!   `warn`); `RUST_LOG` overrides both
//! - `--config <path>` names the configuration file (see [`crate::config`])
//! - `--no-progress` hides spinners and progress bars
//!
//! Configuration is loaded once, before the command runs, and merged with the
//! command's flags into an immutable request.

mod common;
mod cycles;
mod install;
mod resolve;
mod tree;
mod why;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use common::{CommandContext, OutputFormat, RequirementArgs, ResolveArgs};

use crate::config::ResolverConfig;
use crate::constants::CONFIG_ENV_VAR;
use crate::core::CancellationSignal;

/// Dependency resolver and installer for Python web deployments.
#[derive(Parser, Debug)]
#[command(name = "pwi", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (default: ~/.pwi/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Hide spinners and progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve requirements into an installation plan
    Resolve(resolve::ResolveCommand),
    /// Resolve requirements and install them with pip
    Install(install::InstallCommand),
    /// Show the resolved dependency tree
    Tree(tree::TreeCommand),
    /// Show how one package comes to require another
    Why(why::WhyCommand),
    /// List circular dependencies among the explored packages
    Cycles(cycles::CyclesCommand),
}

impl Cli {
    /// Set up logging, load the configuration and run the command.
    ///
    /// # Errors
    ///
    /// Returns the command's error, or an error if the configuration cannot
    /// be loaded.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_level());

        let env_value = std::env::var(CONFIG_ENV_VAR).ok();
        let ctx = self.context(ResolverConfig::load(self.config.as_deref(), env_value.as_deref())?);
        ctx.cancel.cancel_on_ctrl_c();

        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&ctx).await,
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::Tree(cmd) => cmd.execute(&ctx).await,
            Commands::Why(cmd) => cmd.execute(&ctx).await,
            Commands::Cycles(cmd) => cmd.execute(&ctx).await,
        }
    }

    /// Default log filter for the verbosity flags
    const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn context(&self, config: ResolverConfig) -> CommandContext {
        CommandContext {
            config,
            show_progress: !self.no_progress && !self.quiet,
            cancel: CancellationSignal::new(),
        }
    }
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` wins over
/// `default_level` when set.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
