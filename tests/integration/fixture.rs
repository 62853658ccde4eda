use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated data, config and workspace directories for driving the binary.
pub struct CliFixture {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub config_home: PathBuf,
    pub workspace: PathBuf,
}

impl CliFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let config_home = temp_dir.path().join("config");
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).expect("Failed to create workspace");
        Self {
            temp_dir,
            data_dir,
            config_home,
            workspace,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("skillhub").expect("binary builds");
        cmd.env("SKILLHUB_HOME", &self.data_dir)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env_remove("SKILLHUB_CONFIG")
            .env_remove("RUST_LOG")
            .current_dir(&self.workspace);
        cmd
    }

    /// Run with `--json` and return the envelope's `data`.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().arg("--json").args(args).output().expect("run skillhub");
        assert!(
            output.status.success(),
            "skillhub {args:?} failed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("JSON stdout");
        assert_eq!(envelope["status"], "ok");
        envelope["data"].clone()
    }

    /// Run with `--json`, expect failure, return the structured error.
    pub fn json_err(&self, args: &[&str]) -> Value {
        let output = self.cmd().arg("--json").args(args).output().expect("run skillhub");
        assert!(!output.status.success(), "skillhub {args:?} unexpectedly succeeded");
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("JSON stdout");
        envelope["status"]["error"].clone()
    }

    pub fn write_workspace_skill(&self, dir: &str, content: &str) -> PathBuf {
        let skill_dir = self.workspace.join(".claude/skills").join(dir);
        std::fs::create_dir_all(&skill_dir).expect("Failed to create skill dir");
        let path = skill_dir.join("SKILL.md");
        std::fs::write(&path, content).expect("Failed to write SKILL.md");
        path
    }

    pub fn write_file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }
}

/// Ids of a `skills` array in a JSON payload.
pub fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|s| s["id"].as_str().expect("id").to_string())
        .collect()
}
