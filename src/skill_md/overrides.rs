//! `skill.override.yaml`, a secondary file laid over the definition header.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::skill::{InstallSpec, InvocationPolicy, Requirements, RuntimeConfig, Skill};
use crate::error::{HubError, Result};

pub const OVERRIDE_FILE: &str = "skill.override.yaml";

/// Fields an override file may replace. Absent fields leave the skill alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkillOverride {
    pub name: Option<String>,
    pub description: Option<String>,
    pub command: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "allowed-tools")]
    pub allowed_tools: Option<Vec<String>>,
    pub enabled: Option<bool>,
    #[serde(alias = "requires")]
    pub requirements: Option<Requirements>,
    pub runtime: Option<RuntimeConfig>,
    pub install: Option<Vec<InstallSpec>>,
    pub invocation: Option<InvocationPolicy>,
}

impl SkillOverride {
    pub fn apply(self, skill: &mut Skill) {
        if let Some(name) = self.name {
            skill.name = name;
        }
        if let Some(description) = self.description {
            skill.description = description;
        }
        if let Some(command) = self.command {
            skill.command = command.trim().to_string();
        }
        if let Some(category) = self.category {
            skill.category = category;
        }
        if let Some(tags) = self.tags {
            skill.tags = tags;
        }
        if let Some(tools) = self.allowed_tools {
            skill.allowed_tools = tools;
        }
        if let Some(enabled) = self.enabled {
            skill.enabled = enabled;
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
    }
}

/// Read the override file in `dir`, if any.
pub fn load(dir: &Path) -> Result<Option<SkillOverride>> {
    let path = dir.join(OVERRIDE_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|err| HubError::parse(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::skill::Tier;
    use crate::skill_md::load_skill_dir;
    use crate::test_utils::fixtures::{WorkspaceFixture, skill_md};

    #[test]
    fn override_replaces_only_present_fields() {
        let fixture = WorkspaceFixture::new();
        fixture.write_skill("lint", &skill_md("Lint", "/lint", "Run the linter."));
        fixture.create_file(
            ".claude/skills/lint/skill.override.yaml",
            "enabled: false\nrequires:\n  bins: [eslint]\n",
        );
        let skill = load_skill_dir(&fixture.skill_dir("lint"), Tier::Workspace).unwrap();
        assert!(!skill.enabled);
        assert_eq!(skill.requirements.bins, vec!["eslint"]);
        assert_eq!(skill.name, "Lint");
        assert_eq!(skill.prompt, "Run the linter.");
    }

    #[test]
    fn unknown_override_field_is_parse_error() {
        let fixture = WorkspaceFixture::new();
        fixture.write_skill("lint", &skill_md("Lint", "/lint", "body"));
        fixture.create_file(".claude/skills/lint/skill.override.yaml", "prompt: nope\n");
        let err = load_skill_dir(&fixture.skill_dir("lint"), Tier::Workspace).unwrap_err();
        assert!(matches!(err, HubError::Parse { .. }));
    }

    #[test]
    fn missing_override_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }
}
