//! skillhub show - Show one skill at a load level

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, tier_label, yes_no};
use crate::core::skill::{LoadLevel, Skill};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Skill id
    pub id: String,

    /// How much to load: metadata, body, full
    #[arg(long, short, default_value = "body")]
    pub level: LoadLevel,
}

pub fn run(ctx: &AppContext, args: &ShowArgs) -> Result<()> {
    let skill = ctx.manager.loader().load(&args.id, args.level)?;
    let overrides = ctx.manager.overrides(&args.id);

    if ctx.json() {
        return emit_json(serde_json::json!({
            "skill": &*skill,
            "overrides": overrides,
        }));
    }
    show_human(&skill, &overrides);
    Ok(())
}

fn show_human(skill: &Skill, overrides: &[crate::core::skill::Tier]) {
    println!("{} {}", skill.name.bold(), format!("({})", skill.id).dimmed());
    if !skill.description.is_empty() {
        println!("{}", skill.description);
    }
    println!();
    println!("{:12} {}", "Command:".dimmed(), skill.command.cyan());
    println!("{:12} {}", "Tier:".dimmed(), tier_label(skill.tier));
    println!("{:12} {}", "Enabled:".dimmed(), yes_no(skill.enabled));
    if skill.built_in {
        println!("{:12} {}", "Built-in:".dimmed(), yes_no(true));
    }
    if !skill.category.is_empty() {
        println!("{:12} {}", "Category:".dimmed(), skill.category);
    }
    if !skill.tags.is_empty() {
        println!("{:12} {}", "Tags:".dimmed(), skill.tags.join(", "));
    }
    if let Some(version) = &skill.version {
        println!("{:12} {}", "Version:".dimmed(), version);
    }
    if let Some(dir) = &skill.source_dir {
        println!("{:12} {}", "Source:".dimmed(), dir.display());
    }
    if !overrides.is_empty() {
        let shadowed: Vec<_> = overrides.iter().map(|t| t.as_str()).collect();
        println!("{:12} {}", "Overrides:".dimmed(), shadowed.join(" > "));
    }

    if skill.load_level != LoadLevel::Metadata {
        println!();
        println!("{}", skill.prompt);
    }
    if !skill.files.is_empty() {
        println!();
        println!("{}", "Files:".bold());
        for file in &skill.files {
            println!("  {} {}", file.path, format!("({} bytes)", file.content.len()).dimmed());
        }
    }
}
