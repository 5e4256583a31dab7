//! Resolve requirements and install the plan with pip.
//!
//! Every package is installed with `pip install --no-deps` at its planned
//! version, in plan order. The environment is captured with `pip freeze`
//! first and restored if any step fails or the command is interrupted.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, RequirementArgs, ResolveArgs, Session};
use crate::config::ResolverConfig;
use crate::installer::{FreezeRollback, PipInstaller, execute_plan, locate_pip};
use crate::utils::ProgressBar;

#[derive(Args, Debug)]
pub struct InstallCommand {
    #[command(flatten)]
    inputs: RequirementArgs,

    #[command(flatten)]
    options: ResolveArgs,

    /// Virtual environment to install into
    #[arg(long, value_name = "PATH")]
    venv: Option<PathBuf>,

    /// pip executable to use (overrides --venv)
    #[arg(long, value_name = "PATH")]
    pip: Option<PathBuf>,
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let (explicit, venv) = self.pip_sources(&ctx.config);
        let pip = locate_pip(explicit, venv)?;
        tracing::debug!("using pip at {}", pip.display());

        let session = Session::open(&self.inputs, &self.options, ctx).await?;
        let outcome = session.resolve(ctx).await?;
        let plan = outcome.plan;
        if plan.is_empty() {
            println!("Nothing to install.");
            return Ok(());
        }

        let bar = ProgressBar::new(plan.len() as u64, ctx.show_progress);
        bar.set_prefix("Installing");
        let installed = execute_plan(
            &plan,
            &PipInstaller::new(pip.clone()),
            &FreezeRollback::new(pip),
            &ctx.cancel,
            |package| {
                bar.set_message(package.pin());
                bar.inc(1);
            },
        )
        .await;
        bar.finish_and_clear();

        let installed = installed?;
        println!("{} Installed {installed} package(s)", "✓".green());
        for package in &plan.packages {
            println!("  {}", package.pin());
        }
        Ok(())
    }

    /// The explicit pip and venv to search, flags before configuration.
    ///
    /// A flag of either kind hides both configuration entries, so `--venv`
    /// wins over a configured `pip`.
    fn pip_sources<'a>(&'a self, config: &'a ResolverConfig) -> (Option<&'a Path>, Option<&'a Path>) {
        match (self.pip.as_deref(), self.venv.as_deref()) {
            (None, None) => (config.pip.as_deref(), config.venv.as_deref()),
            flags => flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(pip: Option<&str>, venv: Option<&str>) -> InstallCommand {
        InstallCommand {
            inputs: RequirementArgs::default(),
            options: ResolveArgs::default(),
            venv: venv.map(PathBuf::from),
            pip: pip.map(PathBuf::from),
        }
    }

    #[test]
    fn test_flags_take_precedence_over_configured_pip() {
        let config = ResolverConfig {
            pip: Some(PathBuf::from("/config/pip")),
            venv: Some(PathBuf::from("/config/venv")),
            ..ResolverConfig::default()
        };

        let venv_flag = command(None, Some("/flag/venv"));
        assert_eq!(venv_flag.pip_sources(&config), (None, Some(Path::new("/flag/venv"))));

        let pip_flag = command(Some("/flag/pip"), None);
        assert_eq!(pip_flag.pip_sources(&config), (Some(Path::new("/flag/pip")), None));

        let none = command(None, None);
        assert_eq!(none.pip_sources(&config), (Some(Path::new("/config/pip")), Some(Path::new("/config/venv"))));
    }
}
