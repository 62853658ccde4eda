//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod check;
pub mod clone;
pub mod create;
pub mod delete;
pub mod list;
pub mod show;
pub mod status;
pub mod store;
pub mod toggle;
pub mod workspace;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::List(args) => list::run(ctx, args),
        Commands::Show(args) => show::run(ctx, args),
        Commands::Create(args) => create::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Enable(args) => toggle::run(ctx, args, true),
        Commands::Disable(args) => toggle::run(ctx, args, false),
        Commands::Clone(args) => clone::run(ctx, args),
        Commands::Check(args) => check::run(ctx, args),
        Commands::Status(args) => status::run(ctx, args),
        Commands::Workspace(cmd) => workspace::run(ctx, cmd),
        Commands::Store(cmd) => store::run(ctx, cmd),
    }
}
