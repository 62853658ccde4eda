use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::skill::{Skill, Tier};

/// Isolated workspace on disk with helpers to lay out skill directories.
pub struct WorkspaceFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub skills_subpath: PathBuf,
}

impl WorkspaceFixture {
    /// Workspace using the default `.claude/skills` subpath.
    pub fn new() -> Self {
        Self::with_subpath(crate::workspace::DEFAULT_SKILLS_SUBPATH)
    }

    pub fn with_subpath(subpath: impl AsRef<Path>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            root,
            skills_subpath: subpath.as_ref().to_path_buf(),
        }
    }

    /// The `<root>/<subpath>` directory holding skill directories.
    pub fn skills_dir(&self) -> PathBuf {
        self.root.join(&self.skills_subpath)
    }

    /// Directory of one skill.
    pub fn skill_dir(&self, dir_name: &str) -> PathBuf {
        self.skills_dir().join(dir_name)
    }

    /// Create a file relative to the workspace root.
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Write `<skills>/<dir_name>/SKILL.md`.
    pub fn write_skill(&self, dir_name: &str, content: &str) -> PathBuf {
        let path = self.skill_dir(dir_name).join(crate::skill_md::DEFINITION_FILE);
        std::fs::create_dir_all(self.skill_dir(dir_name)).expect("Failed to create skill dir");
        std::fs::write(&path, content).expect("Failed to write SKILL.md");
        path
    }

    /// Write a file under `<skills>/<dir_name>/references/`.
    pub fn write_reference(&self, dir_name: &str, relative: &str, content: &str) -> PathBuf {
        let path = self.skill_dir(dir_name).join("references").join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create references dir");
        }
        std::fs::write(&path, content).expect("Failed to write reference");
        path
    }

    pub fn remove_skill(&self, dir_name: &str) {
        std::fs::remove_dir_all(self.skill_dir(dir_name)).expect("Failed to remove skill dir");
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimal valid definition file.
pub fn skill_md(name: &str, command: &str, body: &str) -> String {
    format!("---\nname: {name}\ndescription: {name} skill\ncommand: {command}\n---\n\n{body}\n")
}

/// A populated skill in the given tier.
pub fn sample_skill(id: &str, tier: Tier) -> Skill {
    let mut skill = Skill::new(id, format!("{id} skill"))
        .with_tier(tier)
        .with_prompt(format!("Do the {id} thing."));
    skill.description = format!("{id} from {tier}");
    skill.category = "testing".to_string();
    skill.tags = vec!["fixture".to_string()];
    skill
}
