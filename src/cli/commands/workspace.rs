//! skillhub workspace - Scan or watch workspace skill directories

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Subcommand};
use colored::Colorize;
use crossbeam_channel::unbounded;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::error::Result;
use crate::workspace::WorkspaceChange;

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    /// Scan a workspace once and list its skills
    Scan(ScanArgs),

    /// Watch a workspace and report changes until interrupted
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Workspace root (default: current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Workspace root (default: current directory)
    pub path: Option<PathBuf>,

    /// Stop after this many change batches
    #[arg(long)]
    pub max_changes: Option<usize>,
}

pub fn run(ctx: &AppContext, cmd: &WorkspaceCommand) -> Result<()> {
    match cmd {
        WorkspaceCommand::Scan(args) => scan(ctx, &resolve(args.path.as_deref())?),
        WorkspaceCommand::Watch(args) => watch(ctx, &resolve(args.path.as_deref())?, args.max_changes),
    }
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

fn scan(ctx: &AppContext, workspace: &Path) -> Result<()> {
    ctx.scan_workspace(workspace);
    let skills = ctx.watcher.workspace_skills(workspace);

    if ctx.json() {
        return emit_json(serde_json::json!({
            "workspace": workspace,
            "skills_dir": ctx.watcher.skills_root(workspace),
            "count": skills.len(),
            "skills": skills,
        }));
    }

    let root = ctx.watcher.skills_root(workspace);
    if skills.is_empty() {
        println!("{} {}", "No skills under".dimmed(), root.display());
        return Ok(());
    }
    println!("{} {}", "Skills under".bold(), root.display());
    for skill in &skills {
        let shadowed = ctx
            .manager
            .get(&skill.id)
            .is_ok_and(|winner| winner.tier != skill.tier);
        let note = if shadowed {
            " (shadowed)".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {:24} {}{}", skill.id.bold(), skill.command.cyan(), note);
    }
    Ok(())
}

fn watch(ctx: &AppContext, workspace: &Path, max_changes: Option<usize>) -> Result<()> {
    ctx.scan_workspace(workspace);
    let (tx, rx) = unbounded::<WorkspaceChange>();
    let manager = Arc::clone(&ctx.manager);
    let started = ctx.watcher.watch_workspace(
        workspace,
        Arc::new(move |change| {
            manager.apply_workspace_change(&change);
            let _ = tx.send(change);
        }),
    )?;
    if !started {
        println!(
            "{} {}",
            "Nothing to watch at".yellow(),
            ctx.watcher.skills_root(workspace).display()
        );
        return Ok(());
    }

    if !ctx.json() {
        println!("{} {}", "Watching".bold(), ctx.watcher.skills_root(workspace).display());
    }
    let mut seen = 0usize;
    while let Ok(change) = rx.recv() {
        if ctx.json() {
            println!("{}", serde_json::to_string(&change)?);
        } else {
            print_change(&change);
        }
        seen += 1;
        if max_changes.is_some_and(|max| seen >= max) {
            break;
        }
    }
    ctx.unwatch_workspace(workspace);
    Ok(())
}

fn print_change(change: &WorkspaceChange) {
    for skill in &change.added {
        println!("  {} {}", "+".green().bold(), skill.id);
    }
    for skill in &change.updated {
        println!("  {} {}", "~".yellow().bold(), skill.id);
    }
    for id in &change.removed {
        println!("  {} {}", "-".red().bold(), id);
    }
}
