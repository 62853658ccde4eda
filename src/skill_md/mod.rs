//! SKILL.md definition files.
//!
//! A definition is a `---` delimited YAML header followed by the Markdown
//! prompt body. A skill directory may also carry a `skill.override.yaml`
//! whose fields are laid over the header (see [`overrides`]).
//!
//! ```text
//! ---
//! name: Deploy
//! description: Ship the current branch
//! command: /deploy
//! requirements:
//!   bins: [docker]
//! ---
//!
//! Build the image and push it.
//! ```

use std::fmt::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::skill::{
    InstallSpec, InvocationPolicy, Requirements, RuntimeConfig, Skill, Tier, default_command,
    validate_id,
};
use crate::error::{HubError, Result};

pub mod overrides;

pub use overrides::{OVERRIDE_FILE, SkillOverride};

/// Required definition file in every skill directory.
pub const DEFINITION_FILE: &str = "SKILL.md";

const DELIMITER: &str = "---";

/// The YAML header of a definition file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(alias = "allowed-tools", skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(alias = "required-integrations", skip_serializing_if = "Vec::is_empty")]
    pub required_integrations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(alias = "requires", skip_serializing_if = "is_default")]
    pub requirements: Requirements,
    #[serde(skip_serializing_if = "is_default")]
    pub runtime: RuntimeConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<InstallSpec>,
    #[serde(skip_serializing_if = "is_default")]
    pub invocation: InvocationPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// A parsed definition file.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDefinition {
    pub front: FrontMatter,
    pub body: String,
}

impl SkillDefinition {
    /// Build a skill. `fallback_id` is used when the header has no `id`.
    pub fn into_skill(self, fallback_id: &str, tier: Tier) -> Result<Skill> {
        let front = self.front;
        let id = front
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slugify(fallback_id));
        validate_id(&id)?;
        let name = if front.name.trim().is_empty() {
            id.clone()
        } else {
            front.name
        };
        let mut skill = Skill::new(id, name).with_tier(tier).with_prompt(self.body);
        if let Some(command) = front.command.filter(|c| !c.trim().is_empty()) {
            skill.command = command.trim().to_string();
        } else {
            skill.command = default_command(&skill.id);
        }
        skill.description = front.description;
        skill.category = front.category;
        skill.tags = front.tags;
        skill.allowed_tools = front.allowed_tools;
        skill.required_integrations = front.required_integrations;
        skill.author = front.author;
        skill.version = front.version;
        skill.requirements = front.requirements;
        skill.runtime = front.runtime;
        skill.install = front.install;
        skill.invocation = front.invocation;
        skill.enabled = front.enabled.unwrap_or(true);
        Ok(skill)
    }
}

/// Parse definition text. `path` only labels errors.
pub fn parse(content: &str, path: &Path) -> Result<SkillDefinition> {
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let text = normalized.trim_start_matches('\n');

    let Some(after_open) = text
        .strip_prefix(DELIMITER)
        .and_then(|rest| rest.strip_prefix('\n'))
    else {
        return Err(HubError::parse(path, "missing `---` header"));
    };

    let (header, rest) = split_header(after_open)
        .ok_or_else(|| HubError::parse(path, "unterminated `---` header"))?;

    let front: FrontMatter = if header.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(header).map_err(|err| HubError::parse(path, err.to_string()))?
    };

    let body = rest.strip_prefix('\n').unwrap_or(rest);
    let body = body.strip_suffix('\n').unwrap_or(body);

    Ok(SkillDefinition {
        front,
        body: body.to_string(),
    })
}

/// Split at the closing delimiter line. Returns (header, text after the delimiter line).
fn split_header(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let rest = &text[offset + line.len()..];
            return Some((&text[..offset], rest));
        }
        offset += line.len();
    }
    None
}

/// Render a skill as definition text.
pub fn generate(skill: &Skill) -> Result<String> {
    let front = FrontMatter {
        id: None,
        name: skill.name.clone(),
        description: skill.description.clone(),
        command: Some(skill.command.clone()),
        category: skill.category.clone(),
        tags: skill.tags.clone(),
        allowed_tools: skill.allowed_tools.clone(),
        required_integrations: skill.required_integrations.clone(),
        author: skill.author.clone(),
        version: skill.version.clone(),
        requirements: skill.requirements.clone(),
        runtime: skill.runtime.clone(),
        install: skill.install.clone(),
        invocation: skill.invocation.clone(),
        enabled: (!skill.enabled).then_some(false),
    };
    let header = serde_yaml::to_string(&front)?;

    let mut out = String::with_capacity(header.len() + skill.prompt.len() + 16);
    let _ = writeln!(out, "{DELIMITER}");
    out.push_str(&header);
    if !header.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{DELIMITER}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", skill.prompt);
    Ok(out)
}

/// Load a skill directory: `SKILL.md`, then `skill.override.yaml` if present.
///
/// The directory name is the fallback id and `source_dir` points at `dir`.
pub fn load_skill_dir(dir: &Path, tier: Tier) -> Result<Skill> {
    let definition_path = dir.join(DEFINITION_FILE);
    let content = std::fs::read_to_string(&definition_path)?;
    let definition = parse(&content, &definition_path)?;

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut skill = definition.into_skill(&dir_name, tier)?;

    if let Some(over) = overrides::load(dir)? {
        over.apply(&mut skill);
    }
    skill.source_dir = Some(dir.to_path_buf());
    skill.validate()?;
    Ok(skill)
}

/// Lowercase, with every run of non-alphanumeric characters collapsed to `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;

    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }

    out.trim_matches(|c| c == '-' || c == '.' || c == '_')
        .to_string()
}
