//! Remote skill store.
//!
//! Browses skill repositories hosted on GitHub and installs their skills
//! into the managed tier. A source is one `<owner>/<repo>/<path>` on a
//! branch; every directory under `path` that carries a `SKILL.md` is a skill.

pub mod github;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::disclosure::REFERENCES_DIR;
use crate::core::skill::{CreateSkillRequest, Skill, SkillFile, Tier, UpdateSkillRequest};
use crate::diagnostics::Diagnostics;
use crate::error::{HubError, Result};
use crate::manager::SkillManager;
use crate::skill_md::{self, DEFINITION_FILE};
pub use github::{GH_API, GitHubClient, USER_AGENT, token_from_env};

/// How long a fetched listing is served from cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory inside the repo that holds the skill directories
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

const fn default_true() -> bool {
    true
}

impl RemoteSource {
    #[must_use]
    pub fn github(id: &str, name: &str, owner: &str, repo: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: default_branch(),
            path: String::new(),
            enabled: true,
        }
    }
}

/// Sources registered on every new store.
#[must_use]
pub fn default_sources() -> Vec<RemoteSource> {
    vec![RemoteSource::github(
        "anthropic",
        "Anthropic Skills",
        "anthropics",
        "skills",
    )]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSkillSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub command: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub source_id: String,
    pub source_name: String,
    /// Present in the local catalog
    pub installed: bool,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub api_base: String,
    pub user_agent: String,
    pub cache_ttl: Duration,
    pub token: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            api_base: GH_API.to_string(),
            user_agent: USER_AGENT.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            token: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Listing {
    /// Repo path of the skill directory
    dir: String,
    summary: RemoteSkillSummary,
}

struct CachedListing {
    fetched_at: Instant,
    entries: Vec<Listing>,
}

pub struct SkillStore {
    client: GitHubClient,
    sources: RwLock<Vec<RemoteSource>>,
    cache: Mutex<HashMap<String, CachedListing>>,
    cache_ttl: Duration,
    manager: Arc<SkillManager>,
    diag: Diagnostics,
}

impl std::fmt::Debug for SkillStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillStore")
            .field("api_base", &self.client.api_base())
            .field("sources", &self.sources.read().len())
            .finish_non_exhaustive()
    }
}

impl SkillStore {
    /// Store with the default sources. `options.token` falls back to the environment.
    pub fn new(options: StoreOptions, manager: Arc<SkillManager>, diag: Diagnostics) -> Self {
        let token = options.token.or_else(token_from_env);
        let client = GitHubClient::new(options.api_base, options.user_agent, token);
        Self {
            client,
            sources: RwLock::new(default_sources()),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: options.cache_ttl,
            manager,
            diag,
        }
    }

    // =========================================================================
    // SOURCES
    // =========================================================================

    #[must_use]
    pub fn list_sources(&self) -> Vec<RemoteSource> {
        self.sources.read().clone()
    }

    pub fn add_source(&self, source: RemoteSource) -> Result<()> {
        if source.id.trim().is_empty() || source.owner.trim().is_empty() || source.repo.trim().is_empty() {
            return Err(HubError::ValidationFailed(
                "source needs an id, owner and repo".to_string(),
            ));
        }
        let mut sources = self.sources.write();
        if sources.iter().any(|s| s.id == source.id) {
            return Err(HubError::AlreadyExists(format!("source {}", source.id)));
        }
        self.diag
            .scope(|| info!(source = %source.id, repo = %format!("{}/{}", source.owner, source.repo), "source added"));
        sources.push(source);
        Ok(())
    }

    pub fn remove_source(&self, id: &str) -> Result<RemoteSource> {
        let mut sources = self.sources.write();
        let idx = sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| HubError::NotFound(format!("source {id}")))?;
        self.cache.lock().remove(id);
        Ok(sources.remove(idx))
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut sources = self.sources.write();
        let source = sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| HubError::NotFound(format!("source {id}")))?;
        source.enabled = enabled;
        Ok(())
    }

    fn source(&self, id: &str) -> Result<RemoteSource> {
        let source = self
            .sources
            .read()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| HubError::NotFound(format!("source {id}")))?;
        if !source.enabled {
            return Err(HubError::Forbidden(format!("source {id} is disabled")));
        }
        Ok(source)
    }

    // =========================================================================
    // FETCH
    // =========================================================================

    /// Skills offered by `source_id`, served from cache within the TTL.
    pub fn fetch_skills(&self, source_id: &str) -> Result<Vec<RemoteSkillSummary>> {
        let source = self.source(source_id)?;
        let entries = self.listing(&source)?;
        let installed = self.manager.ids();
        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut summary = entry.summary;
                summary.installed = installed.contains(&summary.id);
                summary
            })
            .collect())
    }

    /// Drop cached listings.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn listing(&self, source: &RemoteSource) -> Result<Vec<Listing>> {
        if let Some(cached) = self.cache.lock().get(&source.id) {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                self.diag
                    .scope(|| debug!(source = %source.id, "store listing cache hit"));
                return Ok(cached.entries.clone());
            }
        }

        let entries = self.fetch_listing(source)?;
        self.cache.lock().insert(
            source.id.clone(),
            CachedListing {
                fetched_at: Instant::now(),
                entries: entries.clone(),
            },
        );
        Ok(entries)
    }

    fn fetch_listing(&self, source: &RemoteSource) -> Result<Vec<Listing>> {
        let dirs: Vec<_> = self
            .client
            .list_dir(&source.owner, &source.repo, &source.path, &source.branch)?
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.is_dir() && !e.name.starts_with('.'))
            .collect();

        let results: Vec<Result<Option<Listing>>> = dirs
            .par_iter()
            .map(|dir| self.summarize(source, &dir.name, &dir.path))
            .collect();

        let mut out = Vec::new();
        for result in results {
            match result {
                Ok(Some(listing)) => out.push(listing),
                Ok(None) => {}
                // A rate limit fails the whole listing.
                Err(err @ HubError::RemoteRateLimited(_)) => return Err(err),
                Err(err) => self
                    .diag
                    .scope(|| warn!(source = %source.id, error = %err, "skipping remote skill")),
            }
        }
        out.sort_by(|a, b| a.summary.id.cmp(&b.summary.id));
        self.diag.scope(|| {
            info!(source = %source.id, dirs = dirs.len(), skills = out.len(), "fetched store listing");
        });
        Ok(out)
    }

    fn summarize(&self, source: &RemoteSource, name: &str, dir: &str) -> Result<Option<Listing>> {
        let Some(skill) = self.fetch_definition(source, name, dir)? else {
            self.diag
                .scope(|| debug!(source = %source.id, dir, "no definition file"));
            return Ok(None);
        };
        Ok(Some(Listing {
            dir: dir.to_string(),
            summary: RemoteSkillSummary {
                id: skill.id,
                name: skill.name,
                description: skill.description,
                command: skill.command,
                category: skill.category,
                author: skill.author,
                version: skill.version,
                source_id: source.id.clone(),
                source_name: source.name.clone(),
                installed: false,
            },
        }))
    }

    fn fetch_definition(&self, source: &RemoteSource, name: &str, dir: &str) -> Result<Option<Skill>> {
        let path = format!("{}/{DEFINITION_FILE}", dir.trim_end_matches('/'));
        let Some(content) = self
            .client
            .get_file(&source.owner, &source.repo, &path, &source.branch)?
        else {
            return Ok(None);
        };
        let definition = skill_md::parse(&content, std::path::Path::new(&path))?;
        let skill = definition.into_skill(name, Tier::Managed)?;
        skill.validate()?;
        Ok(Some(skill))
    }

    // =========================================================================
    // INSTALL
    // =========================================================================

    /// Install (or refresh) `skill_id` from `source_id` into the managed tier.
    pub fn install_skill(&self, source_id: &str, skill_id: &str) -> Result<Skill> {
        let source = self.source(source_id)?;
        let listing = self
            .listing(&source)?
            .into_iter()
            .find(|l| l.summary.id == skill_id)
            .ok_or_else(|| HubError::NotFound(format!("{skill_id} in source {source_id}")))?;

        let name = listing.dir.rsplit('/').next().unwrap_or(skill_id).to_string();
        let skill = self
            .fetch_definition(&source, &name, &listing.dir)?
            .ok_or_else(|| HubError::RemoteFetch(format!("{} vanished from {source_id}", listing.dir)))?;

        let mut req = CreateSkillRequest::from(skill);
        req.tier = Some(Tier::Managed);
        req.source_dir = None;
        req.files = self.fetch_references(&source, &listing.dir)?;

        let installed = match self.manager.create(req.clone()) {
            Err(HubError::AlreadyExists(id)) => {
                // Only a managed winner is refreshed; user and built-in skills are left alone.
                if self.manager.get(&id).map(|s| s.tier).ok() != Some(Tier::Managed) {
                    return Err(HubError::AlreadyExists(id));
                }
                self.diag
                    .scope(|| debug!(skill = skill_id, "already installed; refreshing"));
                let mut refresh = UpdateSkillRequest::from(req);
                refresh.enabled = None;
                self.manager.update(&id, refresh)?
            }
            other => other?,
        };
        self.diag.scope(|| {
            info!(skill = skill_id, source = source_id, files = installed.files.len(), "skill installed");
        });
        Ok(installed)
    }

    /// Every file under `<dir>/references/`, paths relative to `dir`.
    fn fetch_references(&self, source: &RemoteSource, dir: &str) -> Result<Vec<SkillFile>> {
        let dir = dir.trim_end_matches('/');
        let mut files = Vec::new();
        let mut pending = vec![format!("{dir}/{REFERENCES_DIR}")];
        while let Some(current) = pending.pop() {
            let Some(entries) = self
                .client
                .list_dir(&source.owner, &source.repo, &current, &source.branch)?
            else {
                continue;
            };
            for entry in entries {
                if entry.is_dir() {
                    pending.push(entry.path);
                } else if entry.is_file() {
                    let Some(content) = self
                        .client
                        .get_file(&source.owner, &source.repo, &entry.path, &source.branch)?
                    else {
                        continue;
                    };
                    let rel = entry
                        .path
                        .strip_prefix(dir)
                        .map_or(entry.path.as_str(), |p| p.trim_start_matches('/'))
                        .to_string();
                    files.push(SkillFile { path: rel, content });
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}
