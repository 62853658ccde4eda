//! skillhub list - List skills in the merged catalog

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, tier_label};
use crate::core::skill::{Skill, Tier};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only skills whose winning record came from this tier
    #[arg(long)]
    pub tier: Option<Tier>,

    /// Case-insensitive category filter
    #[arg(long, short)]
    pub category: Option<String>,

    /// Only enabled skills
    #[arg(long)]
    pub enabled: bool,

    /// Filter by tags (any match)
    #[arg(long, short)]
    pub tags: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let mut skills = match (&args.tier, &args.category) {
        (Some(tier), _) => ctx.manager.list_by_tier(*tier),
        (None, Some(category)) => ctx.manager.list_by_category(category),
        (None, None) if args.enabled => ctx.manager.list_enabled(),
        (None, None) => ctx.manager.list(),
    };

    if let (Some(_), Some(category)) = (&args.tier, &args.category) {
        skills.retain(|s| s.category.eq_ignore_ascii_case(category));
    }
    if args.enabled {
        skills.retain(|s| s.enabled);
    }
    if !args.tags.is_empty() {
        skills.retain(|s| args.tags.iter().any(|t| s.tags.contains(t)));
    }

    if ctx.json() {
        let rows: Vec<_> = skills.iter().map(summary_json).collect();
        return emit_json(serde_json::json!({ "count": rows.len(), "skills": rows }));
    }
    list_human(&skills);
    Ok(())
}

fn summary_json(skill: &Skill) -> serde_json::Value {
    serde_json::json!({
        "id": skill.id,
        "name": skill.name,
        "command": skill.command,
        "category": skill.category,
        "tier": skill.tier,
        "enabled": skill.enabled,
        "built_in": skill.built_in,
        "source_path": skill.source_path,
    })
}

fn list_human(skills: &[Skill]) {
    if skills.is_empty() {
        println!("{}", "No skills found".dimmed());
        return;
    }

    println!(
        "{:28} {:24} {:10} {:14} {}",
        "ID".bold(),
        "COMMAND".bold(),
        "TIER".bold(),
        "CATEGORY".bold(),
        "NAME".bold()
    );
    println!("{}", "─".repeat(90).dimmed());

    for skill in skills {
        let id = if skill.id.len() > 26 {
            format!("{}…", &skill.id[..25])
        } else {
            skill.id.clone()
        };
        let disabled = if skill.enabled {
            String::new()
        } else {
            " [disabled]".red().to_string()
        };
        println!(
            "{:28} {:24} {:10} {:14} {}{}",
            id,
            skill.command,
            tier_label(skill.tier),
            if skill.category.is_empty() { "-" } else { &skill.category },
            skill.name,
            disabled
        );
    }

    println!();
    println!("{} {} skills", "Total:".dimmed(), skills.len());
}
