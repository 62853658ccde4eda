//! skillhub delete - Delete a user or managed skill

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Skill id
    pub id: String,
}

pub fn run(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    ctx.manager.delete(&args.id)?;
    if ctx.json() {
        return emit_json(serde_json::json!({ "deleted": args.id }));
    }
    println!("{} {}", "Deleted".green().bold(), args.id.bold());
    Ok(())
}
