//! skillhub status - Eligibility with configured overrides and install options

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, tier_label, yes_no};
use crate::core::dependencies::{DockerExecutor, RemoteExecutor};
use crate::core::status::SkillStatus;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Skill ids (default: every skill)
    pub ids: Vec<String>,

    /// Run probes inside this container via `docker exec`
    #[arg(long)]
    pub container: Option<String>,

    /// Only skills that are not eligible
    #[arg(long)]
    pub ineligible: bool,
}

pub fn run(ctx: &AppContext, args: &StatusArgs) -> Result<()> {
    let skills = if args.ids.is_empty() {
        ctx.manager.list()
    } else {
        args.ids
            .iter()
            .map(|id| ctx.manager.get(id))
            .collect::<Result<Vec<_>>>()?
    };
    let executor = args.container.as_ref().map(DockerExecutor::new);
    let executor_ref = executor.as_ref().map(|e| e as &dyn RemoteExecutor);

    let statuses: Vec<SkillStatus> = skills
        .iter()
        .map(|skill| ctx.resolver.build_status(skill, &ctx.config.skills, executor_ref))
        .filter(|status| !args.ineligible || !status.eligible)
        .collect();

    if ctx.json() {
        return emit_json(serde_json::json!({ "count": statuses.len(), "statuses": statuses }));
    }

    if statuses.is_empty() {
        println!("{}", "No skills to report".dimmed());
        return Ok(());
    }
    for status in &statuses {
        print_status(status);
    }
    Ok(())
}

fn print_status(status: &SkillStatus) {
    let marker = if status.eligible { "●".green() } else { "●".red() };
    println!(
        "{} {} {} {}",
        marker,
        status.id.bold(),
        tier_label(status.tier),
        format!("[{}]", status.platform).dimmed()
    );
    if !status.enabled {
        println!("  {:18} {}", "Enabled:".dimmed(), yes_no(false));
    }
    if status.blocked {
        println!("  {:18} {}", "Blocked:".dimmed(), "yes".red());
    }
    if !status.check.satisfied {
        super::check::print_check(&status.check);
    }
    for option in &status.install_options {
        println!("  {:18} {}", "Install:".dimmed(), option.label.cyan());
    }
}
