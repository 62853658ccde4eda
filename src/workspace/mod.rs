//! Workspace skill discovery and hot reload.
//!
//! Each workspace keeps its skills under `<workspace>/<skills_subpath>/<dir>/SKILL.md`.
//! [`WorkspaceWatcher`] scans those directories once on demand and can keep
//! watching them, delivering one debounced [`WorkspaceChange`] per burst of
//! filesystem activity.

mod event_loop;
mod scan;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use notify::{RecommendedWatcher, Watcher};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::skill::Skill;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use event_loop::WatchLoop;
pub use scan::SkillDirMap;

/// Skills directory relative to a workspace root.
pub const DEFAULT_SKILLS_SUBPATH: &str = ".claude/skills";

/// Quiet period before a burst of events is reconciled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One reconciled batch of workspace edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceChange {
    pub workspace: PathBuf,
    pub added: Vec<Skill>,
    pub updated: Vec<Skill>,
    /// Ids that disappeared
    pub removed: Vec<String>,
}

impl WorkspaceChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Receives every non-empty change. Runs on the workspace's loop thread.
pub type ChangeListener = Arc<dyn Fn(WorkspaceChange) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub skills_subpath: PathBuf,
    pub debounce: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            skills_subpath: PathBuf::from(DEFAULT_SKILLS_SUBPATH),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

struct WatchHandle {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    fn shutdown(mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            // A listener that unwatches its own workspace cannot join itself.
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

pub struct WorkspaceWatcher {
    options: WatcherOptions,
    cache: Arc<RwLock<HashMap<PathBuf, SkillDirMap>>>,
    watches: Mutex<HashMap<PathBuf, WatchHandle>>,
    diag: Diagnostics,
}

impl std::fmt::Debug for WorkspaceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceWatcher")
            .field("options", &self.options)
            .field("watched", &self.watches.lock().len())
            .finish_non_exhaustive()
    }
}

impl WorkspaceWatcher {
    pub fn new(options: WatcherOptions, diag: Diagnostics) -> Self {
        Self {
            options,
            cache: Arc::new(RwLock::new(HashMap::new())),
            watches: Mutex::new(HashMap::new()),
            diag,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &WatcherOptions {
        &self.options
    }

    /// `<workspace>/<skills_subpath>`
    #[must_use]
    pub fn skills_root(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.options.skills_subpath)
    }

    /// Scan the workspace once and cache the result.
    pub fn load_workspace_skills(&self, workspace: &Path) -> Vec<Skill> {
        let root = self.skills_root(workspace);
        let found = scan::scan(workspace, &root, &self.diag);
        let skills: Vec<Skill> = found.values().cloned().collect();
        self.cache.write().insert(workspace.to_path_buf(), found);
        self.diag.scope(|| {
            debug!(workspace = %workspace.display(), skills = skills.len(), "workspace scanned");
        });
        skills
    }

    /// Cached skills of `workspace`, empty if it was never scanned.
    #[must_use]
    pub fn workspace_skills(&self, workspace: &Path) -> Vec<Skill> {
        self.cache
            .read()
            .get(workspace)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-examine the given skill directories now and update the cache.
    pub fn reconcile(
        &self,
        workspace: &Path,
        dirs: impl IntoIterator<Item = PathBuf>,
    ) -> WorkspaceChange {
        let mut cache = self.cache.write();
        let entry = cache.entry(workspace.to_path_buf()).or_default();
        scan::reconcile_dirs(workspace, dirs, entry, &self.diag)
    }

    /// Start watching `workspace`. Returns `Ok(false)` when there is nothing
    /// to watch or a watch is already running.
    pub fn watch_workspace(&self, workspace: &Path, listener: ChangeListener) -> Result<bool> {
        let root = self.skills_root(workspace);
        if !root.is_dir() {
            self.diag.scope(|| {
                debug!(root = %root.display(), "skills directory missing; not watching");
            });
            return Ok(false);
        }

        let mut watches = self.watches.lock();
        if watches.contains_key(workspace) {
            return Ok(false);
        }

        if !self.cache.read().contains_key(workspace) {
            self.load_workspace_skills(workspace);
        }

        let (event_tx, event_rx) = unbounded();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = event_tx.send(res);
            },
            notify::Config::default(),
        )?;

        let mut watch_loop = WatchLoop {
            workspace: workspace.to_path_buf(),
            root: root.clone(),
            debounce: self.options.debounce,
            cache: Arc::clone(&self.cache),
            listener,
            diag: self.diag.clone(),
            watcher,
            watched: HashSet::new(),
        };
        watch_loop.watch_tree(&root);

        let (stop_tx, stop_rx) = unbounded();
        let name = format!("skillhub-watch-{}", short_name(workspace));
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || watch_loop.run(&event_rx, &stop_rx))?;

        watches.insert(
            workspace.to_path_buf(),
            WatchHandle {
                stop: stop_tx,
                thread: Some(thread),
            },
        );
        self.diag
            .scope(|| info!(workspace = %workspace.display(), "watching workspace"));
        Ok(true)
    }

    #[must_use]
    pub fn is_watching(&self, workspace: &Path) -> bool {
        self.watches.lock().contains_key(workspace)
    }

    #[must_use]
    pub fn watched(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.watches.lock().keys().cloned().collect();
        out.sort();
        out
    }

    /// Stop watching `workspace` and drop its cached skills.
    pub fn unwatch_workspace(&self, workspace: &Path) -> bool {
        let handle = self.watches.lock().remove(workspace);
        self.cache.write().remove(workspace);
        match handle {
            Some(handle) => {
                handle.shutdown();
                self.diag
                    .scope(|| info!(workspace = %workspace.display(), "stopped watching workspace"));
                true
            }
            None => false,
        }
    }

    /// Stop every watch.
    pub fn close(&self) {
        let handles: Vec<(PathBuf, WatchHandle)> = self.watches.lock().drain().collect();
        if handles.is_empty() {
            return;
        }
        let mut cache = self.cache.write();
        for (workspace, _) in &handles {
            cache.remove(workspace);
        }
        drop(cache);
        let count = handles.len();
        for (_, handle) in handles {
            handle.shutdown();
        }
        self.diag.scope(|| debug!(count, "workspace watches closed"));
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn short_name(workspace: &Path) -> String {
    workspace
        .file_name()
        .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::core::skill::Tier;
    use crate::test_utils::fixtures::{WorkspaceFixture, skill_md};
    use crate::test_utils::logging::CapturedLogs;

    fn watcher() -> WorkspaceWatcher {
        WorkspaceWatcher::new(WatcherOptions::default(), Diagnostics::none())
    }

    fn fast_watcher() -> WorkspaceWatcher {
        let options = WatcherOptions {
            debounce: Duration::from_millis(100),
            ..WatcherOptions::default()
        };
        WorkspaceWatcher::new(options, Diagnostics::none())
    }

    #[test]
    fn single_skill_is_loaded_with_workspace_source() {
        let fx = WorkspaceFixture::new();
        fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));

        let skills = watcher().load_workspace_skills(&fx.root);
        assert_eq!(skills.len(), 1);
        let skill = &skills[0];
        assert_eq!(skill.id, "pdf");
        assert_eq!(skill.tier, Tier::Workspace);
        assert_eq!(skill.source_path.as_deref(), Some(fx.root.as_path()));
        assert_eq!(skill.source_dir.as_deref(), Some(fx.skill_dir("pdf").as_path()));
    }

    #[test]
    fn missing_directory_is_empty() {
        let fx = WorkspaceFixture::new();
        let w = watcher();
        assert!(w.load_workspace_skills(&fx.root).is_empty());
        assert!(!w.watch_workspace(&fx.root, Arc::new(|_| {})).unwrap());
    }

    #[test]
    fn bad_and_hidden_entries_are_skipped() {
        let logs = CapturedLogs::new();
        let fx = WorkspaceFixture::new();
        fx.write_skill("good", &skill_md("Good", "/good", "ok"));
        fx.write_skill("broken", "no front matter here");
        fx.write_skill(".hidden", &skill_md("Hidden", "/hidden", "no"));
        std::fs::create_dir_all(fx.skill_dir("empty")).unwrap();

        let w = WorkspaceWatcher::new(WatcherOptions::default(), logs.diagnostics());
        let ids: Vec<_> = w
            .load_workspace_skills(&fx.root)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["good"]);
        assert!(logs.contains("skipping invalid workspace skill"));
    }

    #[test]
    fn reconcile_reports_add_update_remove() {
        let fx = WorkspaceFixture::new();
        let w = watcher();
        fx.write_skill("pdf", &skill_md("PDF", "/pdf", "v1"));
        w.load_workspace_skills(&fx.root);

        fx.write_skill("pdf", &skill_md("PDF", "/pdf", "v2"));
        fx.write_skill("csv", &skill_md("CSV", "/csv", "rows"));
        let change = w.reconcile(&fx.root, [fx.skill_dir("pdf"), fx.skill_dir("csv")]);
        assert_eq!(change.updated.len(), 1);
        assert_eq!(change.updated[0].prompt, "v2");
        assert_eq!(change.added.len(), 1);
        assert_eq!(change.added[0].id, "csv");

        fx.remove_skill("pdf");
        let change = w.reconcile(&fx.root, [fx.skill_dir("pdf")]);
        assert_eq!(change.removed, vec!["pdf"]);
        let ids: Vec<_> = w.workspace_skills(&fx.root).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["csv"]);
    }

    #[test]
    fn reconcile_of_untouched_dir_is_empty() {
        let fx = WorkspaceFixture::new();
        let w = watcher();
        let change = w.reconcile(&fx.root, [fx.skill_dir("ghost")]);
        assert!(change.is_empty());
        assert_eq!(change.workspace, fx.root);
    }

    #[test]
    fn custom_subpath_is_honored() {
        let fx = WorkspaceFixture::with_subpath("skills");
        fx.write_skill("lint", &skill_md("Lint", "/lint", "lint it"));
        let options = WatcherOptions {
            skills_subpath: PathBuf::from("skills"),
            ..WatcherOptions::default()
        };
        let w = WorkspaceWatcher::new(options, Diagnostics::none());
        assert_eq!(w.load_workspace_skills(&fx.root).len(), 1);
    }

    #[test]
    fn watch_delivers_debounced_change() {
        let fx = WorkspaceFixture::new();
        std::fs::create_dir_all(fx.skills_dir()).unwrap();
        let w = fast_watcher();
        let (tx, rx) = crossbeam_channel::unbounded();
        let listener: ChangeListener = Arc::new(move |change| {
            let _ = tx.send(change);
        });
        assert!(w.watch_workspace(&fx.root, Arc::clone(&listener)).unwrap());
        assert!(!w.watch_workspace(&fx.root, listener).unwrap());

        fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut added = Vec::new();
        while added.is_empty() && Instant::now() < deadline {
            if let Ok(change) = rx.recv_timeout(Duration::from_millis(200)) {
                added.extend(change.added.into_iter().map(|s| s.id));
            }
        }
        assert_eq!(added, vec!["pdf"]);

        assert!(w.unwatch_workspace(&fx.root));
        assert!(!w.unwatch_workspace(&fx.root));
        assert!(w.workspace_skills(&fx.root).is_empty());
    }

    #[test]
    fn close_stops_all_watches() {
        let a = WorkspaceFixture::new();
        let b = WorkspaceFixture::new();
        std::fs::create_dir_all(a.skills_dir()).unwrap();
        std::fs::create_dir_all(b.skills_dir()).unwrap();
        let w = fast_watcher();
        assert!(w.watch_workspace(&a.root, Arc::new(|_| {})).unwrap());
        assert!(w.watch_workspace(&b.root, Arc::new(|_| {})).unwrap());
        assert_eq!(w.watched().len(), 2);
        w.close();
        assert!(w.watched().is_empty());
        assert!(!w.is_watching(&a.root));
    }
}
