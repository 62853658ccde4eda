//! skillhub clone - Copy a skill into a new user skill

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Skill to copy
    pub id: String,

    /// Id of the copy
    pub new_id: String,

    /// Name of the copy (defaults to the new id)
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(ctx: &AppContext, args: &CloneArgs) -> Result<()> {
    let name = args.name.as_deref().unwrap_or(&args.new_id);
    let skill = ctx.manager.clone_skill(&args.id, &args.new_id, name)?;
    if ctx.json() {
        return emit_json(&skill);
    }
    println!(
        "{} {} {} {}",
        "Cloned".green().bold(),
        args.id,
        "→".dimmed(),
        skill.id.bold()
    );
    Ok(())
}
