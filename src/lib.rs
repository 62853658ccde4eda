//! Skill resolution and capability engine for containerized agents.
//!
//! Skills come from four tiers (user extras, the compiled-in bundle,
//! store-installed skills and per-workspace `SKILL.md` directories) and are
//! merged into one view by tier priority. The [`manager::SkillManager`] owns
//! the catalog; [`core::dependencies::DependencyResolver`] checks what a
//! skill needs on the host or inside a container.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod manager;
pub mod skill_md;
pub mod storage;
pub mod store;
pub mod test_utils;
pub mod workspace;

pub use error::{HubError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
