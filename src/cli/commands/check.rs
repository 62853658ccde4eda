//! skillhub check - Check a skill's requirements, locally or in a container

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, yes_no};
use crate::core::dependencies::{CheckResult, DockerExecutor, InstallReport, MissingRequirements, RemoteExecutor};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Skill id
    pub id: String,

    /// Run probes inside this container via `docker exec`
    #[arg(long)]
    pub container: Option<String>,

    /// Container runtime binary
    #[arg(long, default_value = "docker", requires = "container")]
    pub docker_bin: String,

    /// Install missing python and node packages through the container
    #[arg(long, requires = "container")]
    pub install: bool,
}

pub fn run(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let skill = ctx.manager.get(&args.id)?;
    let executor = args
        .container
        .as_ref()
        .map(|c| DockerExecutor::new(c.clone()).with_binary(args.docker_bin.clone()));
    let executor_ref = executor.as_ref().map(|e| e as &dyn RemoteExecutor);

    let report = if args.install {
        Some(ctx.resolver.install_missing(&skill, executor_ref))
    } else {
        None
    };
    let check = ctx.resolver.check(&skill.requirements, executor_ref);

    if ctx.json() {
        return emit_json(serde_json::json!({
            "id": skill.id,
            "target": args.container.as_deref().unwrap_or("local"),
            "check": check,
            "install": report,
        }));
    }

    let target = args.container.as_deref().unwrap_or("local host");
    println!("{} {} on {}", "Requirements for".bold(), skill.id.bold(), target.cyan());
    print_check(&check);
    if let Some(report) = report {
        print_install(&report);
    }
    Ok(())
}

pub(crate) fn print_check(check: &CheckResult) {
    println!("  {:18} {}", "Satisfied:".dimmed(), yes_no(check.satisfied));
    print_missing(&check.missing);
    if !check.unverified_config.is_empty() {
        println!(
            "  {:18} {}",
            "Unverified config:".dimmed(),
            check.unverified_config.join(", ").yellow()
        );
    }
    if let Some(err) = &check.error {
        println!("  {:18} {}", "Probe error:".dimmed(), err.red());
    }
}

fn print_missing(missing: &MissingRequirements) {
    let rows = [
        ("bins", &missing.bins),
        ("any of bins", &missing.any_bins),
        ("env", &missing.env),
        ("config", &missing.config),
        ("python", &missing.python),
        ("node", &missing.node),
        ("os", &missing.os),
    ];
    for (label, values) in rows {
        if !values.is_empty() {
            println!("  {:18} {}", format!("Missing {label}:").dimmed(), values.join(", ").red());
        }
    }
}

fn print_install(report: &InstallReport) {
    for package in &report.installed {
        println!("  {} {}", "installed".green(), package);
    }
    for failure in &report.failed {
        println!("  {} {}: {}", "failed".red(), failure.package, failure.error.dimmed());
    }
}
