//! Per-workspace watch loop.
//!
//! One thread per workspace selects over raw filesystem events, a stop
//! signal and a debounce deadline. Every qualifying event pushes the
//! deadline out; when it fires, the touched skill directories are reconciled
//! once and a single [`WorkspaceChange`] goes to the listener.

use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, select};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::scan::{SkillDirMap, is_hidden, reconcile_dirs};
use super::ChangeListener;
use crate::core::disclosure::REFERENCES_DIR;
use crate::diagnostics::Diagnostics;
use crate::skill_md::{DEFINITION_FILE, OVERRIDE_FILE};

pub(crate) struct WatchLoop {
    pub workspace: PathBuf,
    pub root: PathBuf,
    pub debounce: Duration,
    pub cache: Arc<RwLock<std::collections::HashMap<PathBuf, SkillDirMap>>>,
    pub listener: ChangeListener,
    pub diag: Diagnostics,
    pub watcher: RecommendedWatcher,
    pub watched: HashSet<PathBuf>,
}

impl WatchLoop {
    /// Watch `dir` and every non-hidden directory below it.
    pub fn watch_tree(&mut self, dir: &Path) {
        let walker = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker.filter_map(std::result::Result::ok) {
            if !entry.file_type().is_dir() || self.watched.contains(entry.path()) {
                continue;
            }
            match self.watcher.watch(entry.path(), RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.watched.insert(entry.path().to_path_buf());
                }
                Err(err) => self.diag.scope(|| {
                    warn!(dir = %entry.path().display(), error = %err, "cannot watch directory");
                }),
            }
        }
    }

    pub fn run(
        mut self,
        events: &Receiver<notify::Result<Event>>,
        stop: &Receiver<()>,
    ) {
        let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let timer = deadline.map_or_else(crossbeam_channel::never, crossbeam_channel::at);
            select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => {
                        if self.handle_event(&event, &mut pending) {
                            deadline = Some(Instant::now() + self.debounce);
                        }
                    }
                    Ok(Err(err)) => self.diag.scope(|| warn!(error = %err, "watch error")),
                    Err(_) => break,
                },
                recv(timer) -> _ => {
                    deadline = None;
                    self.flush(std::mem::take(&mut pending));
                }
            }
        }
        self.diag
            .scope(|| debug!(workspace = %self.workspace.display(), "watch loop stopped"));
    }

    /// Record the skill dir an event touches. Returns true when it qualifies.
    fn handle_event(&mut self, event: &Event, pending: &mut BTreeSet<PathBuf>) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        let mut qualifies = false;
        for path in &event.paths {
            if path.is_dir() && !self.watched.contains(path) && self.is_visible(path) {
                let path = path.clone();
                self.watch_tree(&path);
            }
            if matches!(event.kind, EventKind::Remove(_)) {
                self.watched.remove(path);
            }
            if let Some(skill_dir) = self.qualifying_skill_dir(path) {
                pending.insert(skill_dir);
                qualifies = true;
            }
        }
        qualifies
    }

    /// Inside the root and not under a hidden directory.
    fn is_visible(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .is_ok_and(|rel| !rel.components().any(|c| is_hidden(c.as_os_str())))
    }

    /// The skill directory `path` belongs to, if the path is one the catalog cares about.
    fn qualifying_skill_dir(&self, path: &Path) -> Option<PathBuf> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&std::ffi::OsStr> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        let (first, rest) = parts.split_first()?;
        if is_hidden(first) {
            return None;
        }
        let relevant = match rest.first() {
            None => true,
            Some(name) => {
                *name == DEFINITION_FILE || *name == OVERRIDE_FILE || *name == REFERENCES_DIR
            }
        };
        relevant.then(|| self.root.join(first))
    }

    fn flush(&self, dirs: BTreeSet<PathBuf>) {
        if dirs.is_empty() {
            return;
        }
        let change = {
            let mut cache = self.cache.write();
            let entry = cache.entry(self.workspace.clone()).or_default();
            reconcile_dirs(&self.workspace, dirs, entry, &self.diag)
        };
        if change.is_empty() {
            return;
        }
        self.diag.scope(|| {
            debug!(
                workspace = %self.workspace.display(),
                added = change.added.len(),
                updated = change.updated.len(),
                removed = change.removed.len(),
                "workspace reconciled"
            );
        });
        (self.listener)(change);
    }
}
