//! skillhub store - Browse and install skills from remote repositories

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, yes_no};
use crate::error::Result;
use crate::store::RemoteSource;

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// List registered sources
    Sources,

    /// List the skills a source offers
    Fetch(FetchArgs),

    /// Install a skill into the managed tier
    Install(InstallArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source id
    #[arg(default_value = "anthropic")]
    pub source: String,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Skill id as listed by `store fetch`
    pub skill: String,

    /// Source id
    #[arg(long, short, default_value = "anthropic")]
    pub source: String,
}

pub fn run(ctx: &AppContext, cmd: &StoreCommand) -> Result<()> {
    match cmd {
        StoreCommand::Sources => sources(ctx),
        StoreCommand::Fetch(args) => fetch(ctx, args),
        StoreCommand::Install(args) => install(ctx, args),
    }
}

fn sources(ctx: &AppContext) -> Result<()> {
    let sources = ctx.store.list_sources();
    if ctx.json() {
        return emit_json(&sources);
    }
    for RemoteSource { id, name, owner, repo, branch, path, enabled } in &sources {
        let location = if path.is_empty() {
            format!("{owner}/{repo}@{branch}")
        } else {
            format!("{owner}/{repo}/{path}@{branch}")
        };
        println!("{:16} {:28} {} enabled: {}", id.bold(), name, location.dimmed(), yes_no(*enabled));
    }
    Ok(())
}

fn fetch(ctx: &AppContext, args: &FetchArgs) -> Result<()> {
    let skills = ctx.store.fetch_skills(&args.source)?;
    if ctx.json() {
        return emit_json(serde_json::json!({ "source": args.source, "count": skills.len(), "skills": skills }));
    }
    if skills.is_empty() {
        println!("{}", "No skills found".dimmed());
        return Ok(());
    }
    for skill in &skills {
        let installed = if skill.installed {
            " [installed]".green().to_string()
        } else {
            String::new()
        };
        println!("{:28} {}{}", skill.id.bold(), skill.description, installed);
    }
    println!();
    println!("{} {} skills from {}", "Total:".dimmed(), skills.len(), args.source);
    Ok(())
}

fn install(ctx: &AppContext, args: &InstallArgs) -> Result<()> {
    let skill = ctx.store.install_skill(&args.source, &args.skill)?;
    if ctx.json() {
        return emit_json(&skill);
    }
    println!(
        "{} {} {}",
        "Installed".green().bold(),
        skill.id.bold(),
        format!("({} files)", skill.files.len()).dimmed()
    );
    Ok(())
}
