//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// skillhub - resolve, check and install agent skills
#[derive(Parser, Debug)]
#[command(name = "skillhub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout (and JSON logs on stderr)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (human, json)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/skillhub/config.toml)
    #[arg(long, global = true, env = "SKILLHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the catalog (default: platform data dir)
    #[arg(long, global = true, env = "SKILLHUB_HOME")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `--json` wins over `--output-format`.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            return OutputFormat::Json;
        }
        self.output_format.unwrap_or_default()
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List skills in the merged catalog
    List(commands::list::ListArgs),

    /// Show one skill at a load level
    Show(commands::show::ShowArgs),

    /// Create an extra or managed skill
    Create(commands::create::CreateArgs),

    /// Delete a user or managed skill
    Delete(commands::delete::DeleteArgs),

    /// Enable a skill
    Enable(commands::toggle::ToggleArgs),

    /// Disable a skill
    Disable(commands::toggle::ToggleArgs),

    /// Copy a skill into a new user skill
    Clone(commands::clone::CloneArgs),

    /// Check a skill's requirements, locally or in a container
    Check(commands::check::CheckArgs),

    /// Eligibility status with configured overrides and install options
    Status(commands::status::StatusArgs),

    /// Workspace skill directories
    #[command(subcommand)]
    Workspace(commands::workspace::WorkspaceCommand),

    /// Remote skill store
    #[command(subcommand)]
    Store(commands::store::StoreCommand),
}
