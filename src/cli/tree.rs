//! Display the resolved dependency tree.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, RequirementArgs, ResolveArgs, Session};

#[derive(Args, Debug)]
pub struct TreeCommand {
    #[command(flatten)]
    inputs: RequirementArgs,

    #[command(flatten)]
    options: ResolveArgs,
}

impl TreeCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let session = Session::open(&self.inputs, &self.options, ctx).await?;
        let outcome = session.resolve(ctx).await?;

        if outcome.plan.is_empty() {
            println!("No dependencies found.");
            return Ok(());
        }

        let tree = outcome.plan.to_tree_string();
        print!("{tree}");
        if tree.contains(" (*)") {
            println!();
            println!("{}", "(*) = already shown above".bright_black());
        }
        Ok(())
    }
}
