//! Progressive loading of skills
//!
//! Skills are materialized at three levels of increasing cost:
//!
//! - **metadata**: listing fields only, no prompt and no files
//! - **body**: metadata plus the prompt text
//! - **full**: body plus every file under `<source_dir>/references/`
//!
//! Each level has its own cache keyed by id. Cached values are `Arc<Skill>`
//! snapshots cloned out of the catalog, so callers can never reach the
//! catalog's own records through them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::skill::{LoadLevel, Skill, SkillFile};
use crate::diagnostics::Diagnostics;
use crate::error::{HubError, Result};

/// Subdirectory of a skill's source dir holding reference files.
pub const REFERENCES_DIR: &str = "references";

/// Read access to the canonical merged records.
pub trait SkillLookup: Send + Sync {
    /// An owned copy of the winning record for `id`.
    fn lookup(&self, id: &str) -> Option<Skill>;
}

#[derive(Default)]
struct LevelCaches {
    metadata: HashMap<String, Arc<Skill>>,
    body: HashMap<String, Arc<Skill>>,
    full: HashMap<String, Arc<Skill>>,
    /// Bumped on every invalidation so a racing miss cannot store a stale record.
    generation: u64,
}

impl LevelCaches {
    fn level(&self, level: LoadLevel) -> &HashMap<String, Arc<Skill>> {
        match level {
            LoadLevel::Metadata => &self.metadata,
            LoadLevel::Body => &self.body,
            LoadLevel::Full => &self.full,
        }
    }

    fn level_mut(&mut self, level: LoadLevel) -> &mut HashMap<String, Arc<Skill>> {
        match level {
            LoadLevel::Metadata => &mut self.metadata,
            LoadLevel::Body => &mut self.body,
            LoadLevel::Full => &mut self.full,
        }
    }
}

/// Per-level cache counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub metadata: usize,
    pub body: usize,
    pub full: usize,
}

pub struct ProgressiveLoader {
    source: Arc<dyn SkillLookup>,
    caches: RwLock<LevelCaches>,
    diag: Diagnostics,
}

impl std::fmt::Debug for ProgressiveLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressiveLoader")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ProgressiveLoader {
    pub fn new(source: Arc<dyn SkillLookup>, diag: Diagnostics) -> Self {
        Self {
            source,
            caches: RwLock::new(LevelCaches::default()),
            diag,
        }
    }

    pub fn load_metadata(&self, id: &str) -> Result<Arc<Skill>> {
        self.load(id, LoadLevel::Metadata)
    }

    pub fn load_body(&self, id: &str) -> Result<Arc<Skill>> {
        self.load(id, LoadLevel::Body)
    }

    pub fn load_full(&self, id: &str) -> Result<Arc<Skill>> {
        self.load(id, LoadLevel::Full)
    }

    /// Load `id` at `level`, from cache when possible.
    pub fn load(&self, id: &str, level: LoadLevel) -> Result<Arc<Skill>> {
        let generation = {
            let caches = self.caches.read();
            if let Some(hit) = caches.level(level).get(id) {
                return Ok(Arc::clone(hit));
            }
            caches.generation
        };

        let record = self
            .source
            .lookup(id)
            .ok_or_else(|| HubError::NotFound(id.to_string()))?;
        let materialized = Arc::new(self.materialize(record, level)?);

        let mut caches = self.caches.write();
        if caches.generation != generation {
            // Invalidated while we were reading; hand out the fresh copy uncached.
            return Ok(materialized);
        }
        let entry = caches
            .level_mut(level)
            .entry(id.to_string())
            .or_insert(materialized);
        self.diag
            .scope(|| debug!(skill = id, level = level.as_str(), "loader cache fill"));
        Ok(Arc::clone(entry))
    }

    fn materialize(&self, mut skill: Skill, level: LoadLevel) -> Result<Skill> {
        skill.load_level = level;
        match level {
            LoadLevel::Metadata => {
                skill.prompt.clear();
                skill.files.clear();
            }
            LoadLevel::Body => {
                if !skill.has_prompt() {
                    return Err(HubError::EmptyPrompt(skill.id));
                }
                skill.files.clear();
            }
            LoadLevel::Full => {
                if !skill.has_prompt() {
                    return Err(HubError::EmptyPrompt(skill.id));
                }
                if let Some(dir) = skill.source_dir.clone() {
                    for file in self.read_references(&dir) {
                        match skill.files.iter_mut().find(|f| f.path == file.path) {
                            Some(existing) => *existing = file,
                            None => skill.files.push(file),
                        }
                    }
                }
            }
        }
        Ok(skill)
    }

    /// Files under `<dir>/references/`, paths relative to `dir` with `/` separators.
    fn read_references(&self, dir: &Path) -> Vec<SkillFile> {
        let root = dir.join(REFERENCES_DIR);
        if !root.is_dir() {
            return Vec::new();
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.diag
                        .scope(|| warn!(dir = %root.display(), error = %err, "skipping unreadable reference entry"));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative_slash_path(dir, entry.path()) else {
                continue;
            };
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => files.push(SkillFile { path, content }),
                Err(err) => self
                    .diag
                    .scope(|| warn!(file = %entry.path().display(), error = %err, "skipping reference file")),
            }
        }
        files
    }

    /// Drop `id` from every level.
    pub fn invalidate(&self, id: &str) {
        let mut caches = self.caches.write();
        caches.metadata.remove(id);
        caches.body.remove(id);
        caches.full.remove(id);
        caches.generation = caches.generation.wrapping_add(1);
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        let mut caches = self.caches.write();
        caches.metadata.clear();
        caches.body.clear();
        caches.full.clear();
        caches.generation = caches.generation.wrapping_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let caches = self.caches.read();
        CacheStats {
            metadata: caches.metadata.len(),
            body: caches.body.len(),
            full: caches.full.len(),
        }
    }
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
