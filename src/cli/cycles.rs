//! List circular dependency declarations.
//!
//! Works on the explored graph, so it reports cycles declared by any
//! version that was examined, selected or not.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, OutputFormat, RequirementArgs, ResolveArgs, Session};
use crate::requirement::PackageName;
use crate::resolver::explore;
use crate::utils::spinner_with_message;

#[derive(Args, Debug)]
pub struct CyclesCommand {
    #[command(flatten)]
    inputs: RequirementArgs,

    #[command(flatten)]
    options: ResolveArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl CyclesCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let session = Session::open(&self.inputs, &self.options, ctx).await?;
        let spinner = spinner_with_message("Exploring dependencies...", ctx.show_progress);
        let explored = explore(&session.request, &session.provider, &ctx.cancel).await;
        spinner.finish_and_clear();
        let (graph, _) = explored?;

        let cycles = graph.find_cycles();
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cycles)?),
            OutputFormat::Text if cycles.is_empty() => {
                println!("{} No circular dependencies among {} package(s)", "✓".green(), graph.len());
            }
            OutputFormat::Text => {
                println!("{} {} circular dependency chain(s):", "⚠".yellow(), cycles.len());
                for cycle in &cycles {
                    let names: Vec<&str> = cycle.iter().map(PackageName::as_str).collect();
                    println!("  {}", names.join(" -> "));
                }
            }
        }
        Ok(())
    }
}
