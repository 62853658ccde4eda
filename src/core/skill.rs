//! Skill data structure

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Every trigger command starts with this prefix.
pub const COMMAND_PREFIX: &str = "/";

/// Maximum length of a skill id.
pub const MAX_ID_LEN: usize = 64;

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap_or_else(|err| panic!("invalid id pattern: {err}"))
});

// =============================================================================
// TIERS
// =============================================================================

/// Provenance tier of a skill. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Added by the user through the manager
    Extra,
    /// Compiled-in catalog
    Bundled,
    /// Installed from a remote store
    Managed,
    /// Discovered in a live workspace directory
    Workspace,
    #[serde(other)]
    Unknown,
}

impl Tier {
    /// All known tiers, highest precedence first.
    pub const ALL: [Self; 4] = [Self::Extra, Self::Bundled, Self::Managed, Self::Workspace];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Extra => "extra",
            Self::Bundled => "bundled",
            Self::Managed => "managed",
            Self::Workspace => "workspace",
            Self::Unknown => "unknown",
        }
    }

    /// Tiers whose records are persisted to the catalog store.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Extra | Self::Managed)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "extra" | "user" => Ok(Self::Extra),
            "bundled" | "builtin" | "built-in" => Ok(Self::Bundled),
            "managed" | "remote" => Ok(Self::Managed),
            "workspace" | "project" => Ok(Self::Workspace),
            other => Err(HubError::ValidationFailed(format!(
                "unknown tier {other} (expected extra|bundled|managed|workspace)"
            ))),
        }
    }
}

// =============================================================================
// REQUIREMENTS AND RUNTIME HINTS
// =============================================================================

/// Runtime preconditions a skill declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    /// Binaries that must all be on PATH
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<String>,
    /// Binaries of which at least one must be on PATH
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_bins: Vec<String>,
    /// Environment variable names, optionally `NAME=default`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    /// External configuration key paths (`channels.slack.token`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<String>,
    /// Python packages, pip requirement syntax
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub python: Vec<String>,
    /// Node packages, npm spec syntax
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node: Vec<String>,
    /// Allowed operating systems (linux, macos, windows)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,
    /// Skip checking entirely
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub always: bool,
    /// Env var a configured primary credential is exported as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_env: Option<String>,
}

impl Requirements {
    /// True when no category declares anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
            && self.any_bins.is_empty()
            && self.env.is_empty()
            && self.config.is_empty()
            && self.python.is_empty()
            && self.node.is_empty()
            && self.os.is_empty()
    }
}

/// Resource and runtime hints for the container running the skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<bool>,
}

/// Installation method of an [`InstallSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    Brew,
    Node,
    Go,
    Uv,
    Pip,
    Download,
    #[serde(other)]
    Other,
}

/// One remediation option for a missing dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: InstallKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Binaries this option provides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<String>,
    /// Platforms this option applies to (empty = all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,
}

/// Who may trigger a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationPolicy {
    /// Triggerable by the user via its command
    pub user: bool,
    /// Triggerable by the agent on its own
    pub auto: bool,
    /// Events that trigger the skill
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl Default for InvocationPolicy {
    fn default() -> Self {
        Self {
            user: true,
            auto: true,
            events: Vec::new(),
        }
    }
}

impl InvocationPolicy {
    #[must_use]
    pub fn is_event_triggerable(&self) -> bool {
        !self.events.is_empty()
    }
}

/// How much of a skill has been materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    /// Identity and listing fields only
    Metadata,
    /// Metadata plus prompt text
    Body,
    /// Body plus reference files
    #[default]
    Full,
}

impl LoadLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Body => "body",
            Self::Full => "full",
        }
    }
}

impl FromStr for LoadLevel {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "metadata" | "meta" => Ok(Self::Metadata),
            "body" => Ok(Self::Body),
            "full" => Ok(Self::Full),
            other => Err(HubError::ValidationFailed(format!(
                "unknown load level {other} (expected metadata|body|full)"
            ))),
        }
    }
}

/// A file attached to a skill, path relative to the skill directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFile {
    pub path: String,
    pub content: String,
}

// =============================================================================
// SKILL
// =============================================================================

/// A named, triggerable capability bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<SkillFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_integrations: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub tier: Tier,
    /// Workspace root for workspace-tier skills
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<InstallSpec>,
    #[serde(default)]
    pub invocation: InvocationPolicy,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub built_in: bool,
    #[serde(default)]
    pub load_level: LoadLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl Skill {
    /// Create an enabled extra-tier skill with the default command.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            command: default_command(&id),
            id,
            name: name.into(),
            description: String::new(),
            prompt: String::new(),
            files: Vec::new(),
            source_dir: None,
            allowed_tools: Vec::new(),
            required_integrations: Vec::new(),
            category: String::new(),
            tags: Vec::new(),
            tier: Tier::Extra,
            source_path: None,
            requirements: Requirements::default(),
            runtime: RuntimeConfig::default(),
            install: Vec::new(),
            invocation: InvocationPolicy::default(),
            enabled: true,
            built_in: false,
            load_level: LoadLevel::Full,
            author: None,
            version: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Servable at body/full fidelity.
    #[must_use]
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Check the entity invariants.
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(HubError::ValidationFailed(format!(
                "skill {} has an empty name",
                self.id
            )));
        }
        validate_command(&self.command)
    }
}

/// The command a skill gets when none is declared.
#[must_use]
pub fn default_command(id: &str) -> String {
    format!("{COMMAND_PREFIX}{id}")
}

/// Validate a skill id.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(HubError::ValidationFailed("skill id is required".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(HubError::ValidationFailed(format!(
            "skill id {id} is longer than {MAX_ID_LEN} characters"
        )));
    }
    if !ID_PATTERN.is_match(id) {
        return Err(HubError::ValidationFailed(format!(
            "skill id {id} must be lowercase alphanumeric with '-', '_' or '.'"
        )));
    }
    Ok(())
}

/// Validate a trigger command.
pub fn validate_command(command: &str) -> Result<()> {
    let Some(rest) = command.strip_prefix(COMMAND_PREFIX) else {
        return Err(HubError::ValidationFailed(format!(
            "command {command} must start with {COMMAND_PREFIX}"
        )));
    };
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(HubError::ValidationFailed(format!(
            "command {command} must be a single non-empty word"
        )));
    }
    Ok(())
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Input to `SkillManager::create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateSkillRequest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub command: Option<String>,
    pub prompt: String,
    pub files: Vec<SkillFile>,
    pub source_dir: Option<PathBuf>,
    pub allowed_tools: Vec<String>,
    pub required_integrations: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    /// `extra` (default) or `managed`
    pub tier: Option<Tier>,
    pub requirements: Requirements,
    pub runtime: RuntimeConfig,
    pub install: Vec<InstallSpec>,
    pub invocation: InvocationPolicy,
    pub enabled: Option<bool>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl CreateSkillRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build the skill this request describes.
    pub fn into_skill(self) -> Result<Skill> {
        let tier = self.tier.unwrap_or(Tier::Extra);
        if !tier.is_persisted() {
            return Err(HubError::ValidationFailed(format!(
                "skills cannot be created in the {tier} tier"
            )));
        }
        let mut skill = Skill::new(self.id, self.name).with_tier(tier);
        if let Some(command) = self.command.filter(|c| !c.trim().is_empty()) {
            skill.command = command.trim().to_string();
        }
        skill.description = self.description;
        skill.prompt = self.prompt;
        skill.files = self.files;
        skill.source_dir = self.source_dir;
        skill.allowed_tools = self.allowed_tools;
        skill.required_integrations = self.required_integrations;
        skill.category = self.category;
        skill.tags = self.tags;
        skill.requirements = self.requirements;
        skill.runtime = self.runtime;
        skill.install = self.install;
        skill.invocation = self.invocation;
        skill.enabled = self.enabled.unwrap_or(true);
        skill.author = self.author;
        skill.version = self.version;
        skill.validate()?;
        Ok(skill)
    }
}

impl From<Skill> for CreateSkillRequest {
    fn from(skill: Skill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            description: skill.description,
            command: Some(skill.command),
            prompt: skill.prompt,
            files: skill.files,
            source_dir: skill.source_dir,
            allowed_tools: skill.allowed_tools,
            required_integrations: skill.required_integrations,
            category: skill.category,
            tags: skill.tags,
            tier: Some(skill.tier),
            requirements: skill.requirements,
            runtime: skill.runtime,
            install: skill.install,
            invocation: skill.invocation,
            enabled: Some(skill.enabled),
            author: skill.author,
            version: skill.version,
        }
    }
}

/// Input to `SkillManager::update`. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSkillRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub command: Option<String>,
    pub prompt: Option<String>,
    pub files: Option<Vec<SkillFile>>,
    pub allowed_tools: Option<Vec<String>>,
    pub required_integrations: Option<Vec<String>>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub requirements: Option<Requirements>,
    pub runtime: Option<RuntimeConfig>,
    pub install: Option<Vec<InstallSpec>>,
    pub invocation: Option<InvocationPolicy>,
    pub enabled: Option<bool>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl UpdateSkillRequest {
    /// Only toggles enablement.
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    /// Apply to `skill`. Built-ins take only `enabled`.
    pub fn apply_to(self, skill: &mut Skill) -> Result<()> {
        if let Some(enabled) = self.enabled {
            skill.enabled = enabled;
        }
        if skill.built_in {
            skill.updated_at = Utc::now();
            return Ok(());
        }
        if let Some(name) = self.name {
            skill.name = name;
        }
        if let Some(description) = self.description {
            skill.description = description;
        }
        if let Some(command) = self.command {
            skill.command = command.trim().to_string();
        }
        if let Some(prompt) = self.prompt {
            skill.prompt = prompt;
        }
        if let Some(files) = self.files {
            skill.files = files;
        }
        if let Some(tools) = self.allowed_tools {
            skill.allowed_tools = tools;
        }
        if let Some(integrations) = self.required_integrations {
            skill.required_integrations = integrations;
        }
        if let Some(category) = self.category {
            skill.category = category;
        }
        if let Some(tags) = self.tags {
            skill.tags = tags;
        }
        if let Some(requirements) = self.requirements {
            skill.requirements = requirements;
        }
        if let Some(runtime) = self.runtime {
            skill.runtime = runtime;
        }
        if let Some(install) = self.install {
            skill.install = install;
        }
        if let Some(invocation) = self.invocation {
            skill.invocation = invocation;
        }
        if let Some(author) = self.author {
            skill.author = Some(author);
        }
        if let Some(version) = self.version {
            skill.version = Some(version);
        }
        skill.validate()?;
        skill.updated_at = Utc::now();
        Ok(())
    }
}

impl From<CreateSkillRequest> for UpdateSkillRequest {
    fn from(req: CreateSkillRequest) -> Self {
        Self {
            name: Some(req.name),
            description: Some(req.description),
            command: req.command,
            prompt: Some(req.prompt),
            files: Some(req.files),
            allowed_tools: Some(req.allowed_tools),
            required_integrations: Some(req.required_integrations),
            category: Some(req.category),
            tags: Some(req.tags),
            requirements: Some(req.requirements),
            runtime: Some(req.runtime),
            install: Some(req.install),
            invocation: Some(req.invocation),
            enabled: req.enabled,
            author: req.author,
            version: req.version,
        }
    }
}
