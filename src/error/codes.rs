//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Skill errors
//! - 3xx: Config errors
//! - 5xx: Remote catalog errors
//! - 6xx: Storage errors
//! - 7xx: Workspace errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for `--json` output.
///
/// Each variant maps to a numeric code (e.g., `SkillNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Skill errors (1xx)
    // ========================================
    /// E101: No skill with the requested id in the merged view
    SkillNotFound,
    /// E102: Skill id is already taken
    SkillAlreadyExists,
    /// E103: Definition file could not be parsed
    SkillParseError,
    /// E104: Mutation not allowed for this skill (built-in or workspace)
    SkillForbidden,
    /// E105: Skill has no prompt body yet
    SkillEmptyPrompt,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,

    // ========================================
    // Remote catalog errors (5xx)
    // ========================================
    /// E501: Remote catalog request failed
    RemoteFetchFailed,
    /// E502: Remote catalog API rate limit hit
    RemoteRateLimited,
    /// E503: Remote executor failed to run a probe
    ExecutorFailed,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E602: Failed to write the catalog
    StorageWriteError,
    /// E605: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Workspace errors (7xx)
    // ========================================
    /// E701: Filesystem watcher failed
    WatchFailed,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Validation rules failed
    ValidationFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E905: Generic not found (catch-all)
    NotFound,
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `SkillNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::SkillNotFound => 101,
            Self::SkillAlreadyExists => 102,
            Self::SkillParseError => 103,
            Self::SkillForbidden => 104,
            Self::SkillEmptyPrompt => 105,

            Self::ConfigInvalid => 302,

            Self::RemoteFetchFailed => 501,
            Self::RemoteRateLimited => 502,
            Self::ExecutorFailed => 503,

            Self::StorageWriteError => 602,
            Self::SerializationError => 605,

            Self::WatchFailed => 701,

            Self::ValidationFailed => 801,

            Self::NotFound => 905,
            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::SkillNotFound => "Run `skillhub list` to see all available skills",
            Self::SkillAlreadyExists => "Pick a different id, or update the existing skill instead",
            Self::SkillParseError => "Ensure SKILL.md starts with a `---` YAML header followed by the prompt body",
            Self::SkillForbidden => "Built-in skills can only be enabled or disabled; workspace skills are edited on disk",
            Self::SkillEmptyPrompt => "Add prompt text to the skill before loading its body",

            Self::ConfigInvalid => "Check TOML syntax in the config file and the SKILLHUB_* environment variables",

            Self::RemoteFetchFailed => "Check network connectivity and the source's owner/repo/branch settings",
            Self::RemoteRateLimited => "Set GITHUB_TOKEN (or SKILLHUB_GITHUB_TOKEN) to raise the API rate limit",
            Self::ExecutorFailed => "Check that the container is running and accepts exec requests",

            Self::StorageWriteError => "Check disk space and write permissions on the catalog directory",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",

            Self::WatchFailed => "Check that the workspace exists and the inotify/FSEvents watch limit is not exhausted",

            Self::ValidationFailed => "Review the validation message and fix the offending field",

            Self::NotFound => "The requested resource was not found. Check the path or identifier",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SerializationError | Self::WatchFailed)
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "skill",
            3 => "config",
            5 => "remote",
            6 => "storage",
            7 => "workspace",
            8 => "validation",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::SkillNotFound,
            Self::SkillAlreadyExists,
            Self::SkillParseError,
            Self::SkillForbidden,
            Self::SkillEmptyPrompt,
            Self::ConfigInvalid,
            Self::RemoteFetchFailed,
            Self::RemoteRateLimited,
            Self::ExecutorFailed,
            Self::StorageWriteError,
            Self::SerializationError,
            Self::WatchFailed,
            Self::ValidationFailed,
            Self::NotFound,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
