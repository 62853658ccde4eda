//! skillhub enable / disable

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::core::skill::UpdateSkillRequest;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Skill id
    pub id: String,
}

pub fn run(ctx: &AppContext, args: &ToggleArgs, enabled: bool) -> Result<()> {
    let skill = ctx
        .manager
        .update(&args.id, UpdateSkillRequest::enabled(enabled))?;
    if ctx.json() {
        return emit_json(serde_json::json!({ "id": skill.id, "enabled": skill.enabled }));
    }
    let verb = if enabled { "Enabled".green() } else { "Disabled".yellow() };
    println!("{} {}", verb.bold(), skill.id.bold());
    Ok(())
}
