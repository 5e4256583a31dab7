//! Explain why one package requires another.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, RequirementArgs, ResolveArgs, Session};
use crate::requirement::PackageName;

#[derive(Args, Debug)]
pub struct WhyCommand {
    /// Package the chain starts at
    from: String,

    /// Package the chain ends at
    to: String,

    #[command(flatten)]
    inputs: RequirementArgs,

    #[command(flatten)]
    options: ResolveArgs,
}

impl WhyCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let from = PackageName::parse(&self.from)?;
        let to = PackageName::parse(&self.to)?;

        let session = Session::open(&self.inputs, &self.options, ctx).await?;
        let outcome = session.resolve(ctx).await?;
        if outcome.plan.get(&from).is_none() {
            anyhow::bail!("'{from}' is not part of the resolved packages");
        }

        match outcome.plan.find_dependency_path(&from, &to) {
            Some(path) => {
                let pins: Vec<String> = path
                    .iter()
                    .map(|name| outcome.plan.get(name).map_or_else(|| name.to_string(), |p| p.pin()))
                    .collect();
                println!("{}", pins.join(" -> "));
            }
            None => {
                println!("{} '{from}' does not depend on '{to}'", "✗".yellow());
                if let Some(path) = outcome.graph.find_dependency_path(&from, &to) {
                    let names: Vec<&str> = path.iter().map(PackageName::as_str).collect();
                    println!("  (only through versions that were not selected: {})", names.join(" -> "));
                }
            }
        }
        Ok(())
    }
}
