//! Error handling for skillhub.
//!
//! This module provides:
//! - [`HubError`]: The main error enum for all engine operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context

mod codes;
mod suggestions;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::{suggest_for_error, suggest_similar_skills};

/// Main error type for skillhub operations.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Skill not found: {0}")]
    NotFound(String),

    #[error("Skill already exists: {0}")]
    AlreadyExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Skill validation failed: {0}")]
    ValidationFailed(String),

    #[error("Skill '{0}' has no prompt body")]
    EmptyPrompt(String),

    #[error("Failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Remote catalog rate limit exceeded: {0}")]
    RemoteRateLimited(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Remote executor error: {0}")]
    Executor(String),

    #[error("Catalog storage error: {0}")]
    Storage(String),

    #[error("Filesystem watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl HubError {
    /// Build a parse error for a definition file.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::SkillNotFound,
            Self::AlreadyExists(_) => ErrorCode::SkillAlreadyExists,
            Self::Forbidden(_) => ErrorCode::SkillForbidden,
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::EmptyPrompt(_) => ErrorCode::SkillEmptyPrompt,
            Self::Parse { .. } => ErrorCode::SkillParseError,
            Self::RemoteRateLimited(_) => ErrorCode::RemoteRateLimited,
            Self::RemoteFetch(_) | Self::Http(_) => ErrorCode::RemoteFetchFailed,
            Self::Executor(_) => ErrorCode::ExecutorFailed,
            Self::Storage(_) => ErrorCode::StorageWriteError,
            Self::Watch(_) => ErrorCode::WatchFailed,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Yaml(_) => ErrorCode::SerializationError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::NotFound(id) | Self::AlreadyExists(id) | Self::EmptyPrompt(id) => {
                Some(serde_json::json!({ "skill_id": id }))
            }
            Self::Parse { path, reason } => Some(serde_json::json!({
                "path": path.display().to_string(),
                "reason": reason,
            })),
            _ => None,
        }
    }

    /// True when the error is the caller's fault rather than an environment failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::Forbidden(_)
                | Self::ValidationFailed(_)
                | Self::EmptyPrompt(_)
        )
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_hub_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "SKILL_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "skill", "config", "remote")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `HubError`.
    #[must_use]
    pub fn from_hub_error(err: &HubError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&HubError> for StructuredError {
    fn from(err: &HubError) -> Self {
        Self::from_hub_error(err)
    }
}

/// Result type alias using `HubError`.
pub type Result<T> = std::result::Result<T, HubError>;
