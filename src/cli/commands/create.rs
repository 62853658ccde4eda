//! skillhub create - Create an extra or managed skill

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::core::skill::{CreateSkillRequest, Tier};
use crate::error::{HubError, Result};
use crate::skill_md;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Skill id (lowercase, digits, `-`, `_`, `.`)
    pub id: Option<String>,

    /// Display name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Slash command (defaults to /<id>)
    #[arg(long)]
    pub command: Option<String>,

    /// Prompt body
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt body from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Import a SKILL.md definition instead of passing fields
    #[arg(long, conflicts_with_all = ["prompt", "prompt_file"])]
    pub from: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long)]
    pub tag: Vec<String>,

    /// extra (default) or managed
    #[arg(long)]
    pub tier: Option<Tier>,

    /// Create disabled
    #[arg(long)]
    pub disabled: bool,
}

pub fn run(ctx: &AppContext, args: &CreateArgs) -> Result<()> {
    let req = build_request(args)?;
    let skill = ctx.manager.create(req)?;

    if ctx.json() {
        return emit_json(&skill);
    }
    println!(
        "{} {} {}",
        "Created".green().bold(),
        skill.id.bold(),
        format!("({} in {})", skill.command, skill.tier).dimmed()
    );
    Ok(())
}

fn build_request(args: &CreateArgs) -> Result<CreateSkillRequest> {
    let mut req = match &args.from {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let fallback = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let fallback = args.id.clone().unwrap_or(fallback);
            let skill = skill_md::parse(&content, path)?.into_skill(&fallback, Tier::Extra)?;
            CreateSkillRequest::from(skill)
        }
        None => {
            let id = args
                .id
                .clone()
                .ok_or_else(|| HubError::ValidationFailed("an id or --from is required".into()))?;
            let name = args.name.clone().unwrap_or_else(|| id.clone());
            let mut req = CreateSkillRequest::new(id, name);
            req.description.clone_from(&args.description);
            req.category.clone_from(&args.category);
            req.tags.clone_from(&args.tag);
            req.prompt = match (&args.prompt, &args.prompt_file) {
                (Some(prompt), _) => prompt.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            req
        }
    };

    if args.from.is_some() {
        if let Some(id) = &args.id {
            req.id.clone_from(id);
        }
        if let Some(name) = &args.name {
            req.name.clone_from(name);
        }
    }
    if args.command.is_some() {
        req.command.clone_from(&args.command);
    }
    req.tier = args.tier;
    if args.disabled {
        req.enabled = Some(false);
    }
    Ok(req)
}
