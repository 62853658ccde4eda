use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::dependencies::ConfigKeyPolicy;
use crate::core::status::{SkillEntryConfig, SkillsConfig};
use crate::error::{HubError, Result};
use crate::store::{DEFAULT_CACHE_TTL, GH_API, RemoteSource, USER_AGENT};
use crate::workspace::{DEFAULT_DEBOUNCE, DEFAULT_SKILLS_SUBPATH};

/// File name of the catalog blob inside the data directory.
pub const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
}

impl Config {
    /// Defaults, then either the explicit file or the global and data-dir
    /// files, then `SKILLHUB_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, data_root: &Path) -> Result<Self> {
        Self::load_with(explicit_path, data_root, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with(
        explicit_path: Option<&Path>,
        data_root: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("SKILLHUB_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                HubError::Config(format!("config file {} does not exist", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(local) = Self::load_patch(&data_root.join("config.toml"))? {
                config.merge_patch(local);
            }
        }

        config.apply_env_overrides(&env)?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("skillhub/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| HubError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| HubError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.catalog {
            self.catalog.merge(patch);
        }
        if let Some(patch) = patch.workspace {
            self.workspace.merge(patch);
        }
        if let Some(patch) = patch.store {
            self.store.merge(patch);
        }
        if let Some(patch) = patch.resolver {
            self.resolver.merge(patch);
        }
        if let Some(patch) = patch.skills {
            self.skills.entries.extend(patch.entries);
            self.skills.blocked = merge_unique(patch.blocked, &self.skills.blocked);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("SKILLHUB_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = env("SKILLHUB_WORKSPACE_SKILLS_SUBPATH") {
            self.workspace.skills_subpath = PathBuf::from(value);
        }
        if let Some(value) = env_u64(env, "SKILLHUB_WORKSPACE_DEBOUNCE_MS")? {
            self.workspace.debounce = Duration::from_millis(value);
        }
        if let Some(values) = env_list(env, "SKILLHUB_WORKSPACE_PATHS") {
            let existing: Vec<String> = self
                .workspace
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            self.workspace.paths = merge_unique(values, &existing)
                .into_iter()
                .map(PathBuf::from)
                .collect();
        }

        if let Some(value) = env("SKILLHUB_STORE_API_BASE") {
            self.store.api_base = value;
        }
        if let Some(value) = env("SKILLHUB_STORE_USER_AGENT") {
            self.store.user_agent = value;
        }
        if let Some(value) = env_u64(env, "SKILLHUB_STORE_CACHE_TTL_SECONDS")? {
            self.store.cache_ttl = Duration::from_secs(value);
        }

        if let Some(value) = env("SKILLHUB_RESOLVER_CONFIG_KEYS") {
            self.resolver.config_keys = value.parse()?;
        }

        if let Some(values) = env_list(env, "SKILLHUB_BLOCKED_SKILLS") {
            self.skills.blocked = merge_unique(values, &self.skills.blocked);
        }

        Ok(())
    }

    /// Where the catalog blob lives.
    #[must_use]
    pub fn catalog_path(&self, data_root: &Path) -> PathBuf {
        self.catalog
            .path
            .clone()
            .unwrap_or_else(|| data_root.join(CATALOG_FILE))
    }
}

/// `SKILLHUB_HOME`, else `<platform data dir>/skillhub`, else `./.skillhub`.
#[must_use]
pub fn default_data_root() -> PathBuf {
    if let Some(home) = std::env::var_os("SKILLHUB_HOME") {
        return PathBuf::from(home);
    }
    dirs::data_dir().map_or_else(|| PathBuf::from(".skillhub"), |dir| dir.join("skillhub"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog blob path; defaults to `<data root>/catalog.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    fn merge(&mut self, patch: CatalogPatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_skills_subpath")]
    pub skills_subpath: PathBuf,
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
    /// Workspaces scanned at startup
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

fn default_skills_subpath() -> PathBuf {
    PathBuf::from(DEFAULT_SKILLS_SUBPATH)
}

const fn default_debounce() -> Duration {
    DEFAULT_DEBOUNCE
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            skills_subpath: default_skills_subpath(),
            debounce: DEFAULT_DEBOUNCE,
            paths: Vec::new(),
        }
    }
}

impl WorkspaceConfig {
    fn merge(&mut self, patch: WorkspacePatch) {
        if let Some(value) = patch.skills_subpath {
            self.skills_subpath = value;
        }
        if let Some(value) = patch.debounce {
            self.debounce = value;
        }
        if let Some(values) = patch.paths {
            self.paths = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Registered in addition to the built-in sources
    #[serde(default)]
    pub sources: Vec<RemoteSource>,
}

fn default_api_base() -> String {
    GH_API.to_string()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

const fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            cache_ttl: DEFAULT_CACHE_TTL,
            sources: Vec::new(),
        }
    }
}

impl StoreConfig {
    fn merge(&mut self, patch: StorePatch) {
        if let Some(value) = patch.api_base {
            self.api_base = value;
        }
        if let Some(value) = patch.user_agent {
            self.user_agent = value;
        }
        if let Some(value) = patch.cache_ttl {
            self.cache_ttl = value;
        }
        if let Some(sources) = patch.sources {
            for source in sources {
                self.sources.retain(|s| s.id != source.id);
                self.sources.push(source);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub config_keys: ConfigKeyPolicy,
}

impl ResolverConfig {
    fn merge(&mut self, patch: ResolverPatch) {
        if let Some(value) = patch.config_keys {
            self.config_keys = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub catalog: Option<CatalogPatch>,
    pub workspace: Option<WorkspacePatch>,
    pub store: Option<StorePatch>,
    pub resolver: Option<ResolverPatch>,
    pub skills: Option<SkillsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogPatch {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WorkspacePatch {
    pub skills_subpath: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub debounce: Option<Duration>,
    pub paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorePatch {
    pub api_base: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub cache_ttl: Option<Duration>,
    pub sources: Option<Vec<RemoteSource>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResolverPatch {
    pub config_keys: Option<ConfigKeyPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SkillsPatch {
    pub entries: std::collections::BTreeMap<String, SkillEntryConfig>,
    pub blocked: Vec<String>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn env_u64(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match env(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| HubError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

fn env_list(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    env(key).map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.workspace.skills_subpath, PathBuf::from(".claude/skills"));
        assert_eq!(config.workspace.debounce, Duration::from_millis(500));
        assert_eq!(config.store.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.store.api_base, GH_API);
        assert_eq!(config.resolver.config_keys, ConfigKeyPolicy::AssumeSatisfied);
    }

    #[test]
    fn load_patch_nonexistent_file() {
        let result = Config::load_patch(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_patch_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(Config::load_patch(&path), Err(HubError::Config(_))));
    }

    #[test]
    fn explicit_file_sections_merge() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            r##"
[workspace]
skills_subpath = "skills"
debounce = "250ms"

[store]
cache_ttl = "1m"

[[store.sources]]
id = "team"
name = "Team Skills"
owner = "acme"
repo = "skills"
path = "catalog"

[resolver]
config_keys = "assume_unsatisfied"

[skills]
blocked = ["danger"]

[skills.entries.slack]
api_key = "xoxb"
env = { SLACK_CHANNEL = "#ops" }
"##,
        )
        .unwrap();

        let config = Config::load_with(Some(&path), temp.path(), no_env).unwrap();
        assert_eq!(config.workspace.skills_subpath, PathBuf::from("skills"));
        assert_eq!(config.workspace.debounce, Duration::from_millis(250));
        assert_eq!(config.store.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.store.sources.len(), 1);
        assert_eq!(config.store.sources[0].branch, "main");
        assert_eq!(config.resolver.config_keys, ConfigKeyPolicy::AssumeUnsatisfied);
        assert!(config.skills.is_blocked("danger"));
        let slack = config.skills.entry("slack").unwrap();
        assert_eq!(slack.api_key.as_deref(), Some("xoxb"));
        assert_eq!(slack.env.get("SLACK_CHANNEL").map(String::as_str), Some("#ops"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(Config::load_with(Some(&missing), temp.path(), no_env).is_err());
    }

    #[test]
    fn data_root_config_is_read() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "[catalog]\npath = \"/var/lib/skillhub/catalog.json\"\n",
        )
        .unwrap();
        let config = Config::load_with(None, temp.path(), no_env).unwrap();
        assert_eq!(
            config.catalog_path(temp.path()),
            PathBuf::from("/var/lib/skillhub/catalog.json")
        );
    }

    #[test]
    fn env_overrides_win() {
        let temp = TempDir::new().unwrap();
        let env = env_from(&[
            ("SKILLHUB_WORKSPACE_DEBOUNCE_MS", "50"),
            ("SKILLHUB_STORE_API_BASE", "http://127.0.0.1:9"),
            ("SKILLHUB_RESOLVER_CONFIG_KEYS", "unsatisfied"),
            ("SKILLHUB_BLOCKED_SKILLS", "a, b,,a"),
            ("SKILLHUB_WORKSPACE_PATHS", "/w1,/w2"),
        ]);
        let config = Config::load_with(None, temp.path(), env).unwrap();
        assert_eq!(config.workspace.debounce, Duration::from_millis(50));
        assert_eq!(config.store.api_base, "http://127.0.0.1:9");
        assert_eq!(config.resolver.config_keys, ConfigKeyPolicy::AssumeUnsatisfied);
        assert_eq!(config.skills.blocked, vec!["a", "b"]);
        assert_eq!(config.workspace.paths, vec![PathBuf::from("/w1"), PathBuf::from("/w2")]);
        assert_eq!(config.catalog_path(temp.path()), temp.path().join(CATALOG_FILE));
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let temp = TempDir::new().unwrap();
        let env = env_from(&[("SKILLHUB_STORE_CACHE_TTL_SECONDS", "soon")]);
        assert!(matches!(
            Config::load_with(None, temp.path(), env),
            Err(HubError::Config(_))
        ));
    }

    #[test]
    fn merge_unique_prefers_new_order() {
        let merged = merge_unique(
            vec!["b".to_string(), "a".to_string()],
            &["a".to_string(), "c".to_string()],
        );
        assert_eq!(merged, vec!["b", "a", "c"]);
    }
}
