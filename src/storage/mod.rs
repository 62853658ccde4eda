//! Catalog persistence.
//!
//! The catalog is one blob holding every non-built-in extra and managed
//! skill, plus the enablement toggles applied to built-ins. Writes replace
//! the whole blob.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::skill::Skill;
use crate::error::{HubError, Result};

/// Current on-disk format version.
pub const CATALOG_VERSION: u32 = 1;

/// Everything the catalog persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Built-in id -> enabled, for built-ins whose flag was changed
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub builtin_enabled: BTreeMap<String, bool>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn with_skills(skills: Vec<Skill>) -> Self {
        Self {
            skills,
            builtin_enabled: BTreeMap::new(),
        }
    }
}

/// Reads and writes the catalog blob.
pub trait CatalogStore: Send + Sync {
    /// Stored catalog. A missing catalog is empty.
    fn load(&self) -> Result<CatalogSnapshot>;

    /// Replace the stored catalog. Readers never observe a partial write.
    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    #[serde(flatten)]
    snapshot: CatalogSnapshot,
}

/// JSON file written through a temp file and an atomic rename.
#[derive(Debug, Clone)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonFileCatalogStore {
    fn load(&self) -> Result<CatalogSnapshot> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CatalogSnapshot::default());
            }
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(CatalogSnapshot::default());
        }
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|err| HubError::parse(&self.path, err.to_string()))?;
        if file.version > CATALOG_VERSION {
            return Err(HubError::Storage(format!(
                "catalog {} has version {}, newer than supported {CATALOG_VERSION}",
                self.path.display(),
                file.version
            )));
        }
        Ok(file.snapshot)
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|err| HubError::Storage(format!("create {}: {err}", dir.display())))?;

        let body = serde_json::to_vec_pretty(&CatalogFileRef {
            version: CATALOG_VERSION,
            snapshot,
        })?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|err| HubError::Storage(format!("temp file in {}: {err}", dir.display())))?;
        tmp.write_all(&body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| HubError::Storage(format!("write catalog: {err}")))?;
        tmp.persist(&self.path).map_err(|err| {
            HubError::Storage(format!("replace {}: {}", self.path.display(), err.error))
        })?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    version: u32,
    #[serde(flatten)]
    snapshot: &'a CatalogSnapshot,
}

/// Catalog kept in memory. Used when no data directory is configured.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    snapshot: Mutex<CatalogSnapshot>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skills(skills: Vec<Skill>) -> Self {
        Self {
            snapshot: Mutex::new(CatalogSnapshot::with_skills(skills)),
        }
    }

    /// The last saved snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.lock().clone()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<CatalogSnapshot> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        *self.snapshot.lock() = snapshot.clone();
        Ok(())
    }
}
