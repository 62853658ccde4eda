//! Core skill types and logic

pub mod bundled;
pub mod dependencies;
pub mod disclosure;
pub mod layering;
pub mod skill;
pub mod status;

pub use dependencies::{
    CheckResult, ConfigKeyPolicy, DependencyResolver, DockerExecutor, ExecOutput, InstallReport,
    MissingRequirements, RemoteExecutor,
};
pub use disclosure::{ProgressiveLoader, SkillLookup};
pub use layering::{DefaultPriority, MergedSkillSet, PriorityMerger, TierPriority};
pub use skill::{
    CreateSkillRequest, InstallKind, InstallSpec, InvocationPolicy, LoadLevel, Requirements,
    RuntimeConfig, Skill, SkillFile, Tier, UpdateSkillRequest,
};
pub use status::{InstallOption, SkillEntryConfig, SkillStatus, SkillsConfig};
