//! Resolve requirements into an installation plan.
//!
//! ```bash
//! pwi resolve flask>=2.0 --index index.toml
//! pwi resolve -r requirements.txt --output requirements.lock.txt
//! pwi resolve -r requirements.txt --dry-run --format json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, OutputFormat, RequirementArgs, ResolveArgs, Session};
use crate::requirement::PackageName;
use crate::resolver::{DependencyGraph, ResolutionOutcome, check};
use crate::version::conflict::ConflictReport;

#[derive(Args, Debug)]
pub struct ResolveCommand {
    #[command(flatten)]
    inputs: RequirementArgs,

    #[command(flatten)]
    options: ResolveArgs,

    /// Only build the graph and report conflicting constraints
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the pinned requirements to this file
    #[arg(short, long, value_name = "FILE", conflicts_with = "dry_run")]
    output: Option<PathBuf>,
}

impl ResolveCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let session = Session::open(&self.inputs, &self.options, ctx).await?;

        if self.dry_run {
            let (graph, reports) = check(&session.request, &session.provider, &ctx.cancel).await?;
            self.print_reports(&graph, &reports)?;
            return Ok(());
        }

        let outcome = session.resolve(ctx).await?;
        if let Some(path) = &self.output {
            std::fs::write(path, outcome.plan.to_requirements_txt())
                .with_context(|| format!("Failed to write pinned requirements to {}", path.display()))?;
            tracing::info!("wrote {} pin(s) to {}", outcome.plan.len(), path.display());
        }
        self.print_plan(&outcome)
    }

    fn print_plan(&self, outcome: &ResolutionOutcome) -> Result<()> {
        let plan = &outcome.plan;
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "packages": plan.packages,
                    "roots": plan.roots,
                    "fingerprint": plan.fingerprint(),
                    "stats": outcome.stats,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                if plan.is_empty() {
                    println!("Nothing to install.");
                    return Ok(());
                }
                println!("{} Resolved {} package(s) in installation order:", "✓".green(), plan.len());
                for (i, package) in plan.packages.iter().enumerate() {
                    println!("  {:>3}. {}", i + 1, package.pin());
                }
                println!("{} {}", "Fingerprint:".bright_black(), plan.fingerprint().bright_black());
                if let Some(path) = &self.output {
                    println!("Pinned requirements written to {}", path.display());
                }
            }
        }
        Ok(())
    }

    fn print_reports(&self, graph: &DependencyGraph, reports: &[ConflictReport]) -> Result<()> {
        let explored = graph.len();
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "packages": explored,
                    "conflicts": reports,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text if reports.is_empty() => {
                println!("{} No conflicts among {explored} package(s)", "✓".green());
            }
            OutputFormat::Text => {
                println!("{} {} potential conflict(s) among {explored} package(s):", "⚠".yellow(), reports.len());
                for report in reports {
                    println!("  {report}");
                    // Conflicts on root requirements are their own path
                    if let Some(path) = graph.dependency_path(&report.package).filter(|p| p.len() > 1) {
                        let names: Vec<&str> = path.iter().map(PackageName::as_str).collect();
                        println!("    {} {}", "reached via".bright_black(), names.join(" -> "));
                    }
                }
            }
        }
        Ok(())
    }
}
