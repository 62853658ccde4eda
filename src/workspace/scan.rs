//! Directory scans and reconciliation against the cached skill set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::WorkspaceChange;
use crate::core::skill::{Skill, Tier};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::skill_md::{DEFINITION_FILE, load_skill_dir};

/// Skills of one workspace, keyed by skill directory.
pub type SkillDirMap = BTreeMap<PathBuf, Skill>;

pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Parse one skill directory as a workspace skill of `workspace`.
pub(crate) fn parse_skill_dir(dir: &Path, workspace: &Path) -> Result<Skill> {
    let mut skill = load_skill_dir(dir, Tier::Workspace)?;
    skill.source_path = Some(workspace.to_path_buf());
    Ok(skill)
}

/// Scan `<workspace>/<subpath>` once. A missing directory is an empty set.
pub(crate) fn scan(workspace: &Path, root: &Path, diag: &Diagnostics) -> SkillDirMap {
    let mut out = SkillDirMap::new();
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                diag.scope(|| warn!(root = %root.display(), error = %err, "cannot read skills directory"));
            }
            return out;
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| !is_hidden(&e.file_name()))
        .map(|e| e.path())
        .collect();
    dirs.sort();

    for dir in dirs {
        if !dir.join(DEFINITION_FILE).is_file() {
            diag.scope(|| debug!(dir = %dir.display(), "no definition file; skipping"));
            continue;
        }
        match parse_skill_dir(&dir, workspace) {
            Ok(skill) => {
                if out.values().any(|s| s.id == skill.id) {
                    diag.scope(|| warn!(dir = %dir.display(), skill = %skill.id, "duplicate skill id in workspace; skipping"));
                    continue;
                }
                out.insert(dir, skill);
            }
            Err(err) => {
                diag.scope(|| warn!(dir = %dir.display(), error = %err, "skipping invalid workspace skill"));
            }
        }
    }
    out
}

/// Re-examine `dirs` and update `cache` in place, returning what changed.
pub(crate) fn reconcile_dirs(
    workspace: &Path,
    dirs: impl IntoIterator<Item = PathBuf>,
    cache: &mut SkillDirMap,
    diag: &Diagnostics,
) -> WorkspaceChange {
    let mut change = WorkspaceChange {
        workspace: workspace.to_path_buf(),
        ..WorkspaceChange::default()
    };

    for dir in dirs {
        if !dir.join(DEFINITION_FILE).is_file() {
            if let Some(old) = cache.remove(&dir) {
                change.removed.push(old.id);
            }
            continue;
        }

        let skill = match parse_skill_dir(&dir, workspace) {
            Ok(skill) => skill,
            Err(err) => {
                diag.scope(|| warn!(dir = %dir.display(), error = %err, "skipping invalid workspace skill"));
                continue;
            }
        };

        let clash = cache
            .iter()
            .any(|(other_dir, other)| other_dir != &dir && other.id == skill.id);
        if clash {
            diag.scope(|| warn!(dir = %dir.display(), skill = %skill.id, "duplicate skill id in workspace; skipping"));
            continue;
        }

        match cache.insert(dir, skill.clone()) {
            Some(old) if old.id == skill.id => change.updated.push(skill),
            Some(old) => {
                change.removed.push(old.id);
                change.added.push(skill);
            }
            None => change.added.push(skill),
        }
    }
    change
}
