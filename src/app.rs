//! Application context shared by every CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cli::{Cli, OutputFormat};
use crate::config::{Config, default_data_root};
use crate::core::dependencies::DependencyResolver;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::manager::SkillManager;
use crate::storage::JsonFileCatalogStore;
use crate::store::{SkillStore, StoreOptions};
use crate::workspace::{WatcherOptions, WorkspaceWatcher};

pub struct AppContext {
    pub config: Config,
    pub data_root: PathBuf,
    pub output: OutputFormat,
    pub diag: Diagnostics,
    pub manager: Arc<SkillManager>,
    pub watcher: Arc<WorkspaceWatcher>,
    pub resolver: DependencyResolver,
    pub store: SkillStore,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("data_root", &self.data_root)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let data_root = cli.data_dir.clone().unwrap_or_else(default_data_root);
        let config = Config::load(cli.config.as_deref(), &data_root)?;
        Self::build(config, data_root, cli.output_format(), Diagnostics::current())
    }

    /// Wire every component from an already loaded configuration.
    pub fn build(
        config: Config,
        data_root: PathBuf,
        output: OutputFormat,
        diag: Diagnostics,
    ) -> Result<Self> {
        let catalog_path = config.catalog_path(&data_root);
        diag.scope(|| debug!(catalog = %catalog_path.display(), "opening catalog"));
        let store_backend = Arc::new(JsonFileCatalogStore::new(catalog_path));
        let manager = Arc::new(SkillManager::new(store_backend, diag.clone())?);

        let watcher = Arc::new(WorkspaceWatcher::new(
            WatcherOptions {
                skills_subpath: config.workspace.skills_subpath.clone(),
                debounce: config.workspace.debounce,
            },
            diag.clone(),
        ));

        let resolver = DependencyResolver::new(config.resolver.config_keys, diag.clone());

        let store = SkillStore::new(
            StoreOptions {
                api_base: config.store.api_base.clone(),
                user_agent: config.store.user_agent.clone(),
                cache_ttl: config.store.cache_ttl,
                token: None,
            },
            Arc::clone(&manager),
            diag.clone(),
        );
        for source in &config.store.sources {
            if let Err(err) = store.add_source(source.clone()) {
                diag.scope(|| warn!(source = %source.id, error = %err, "ignoring configured source"));
            }
        }

        let ctx = Self {
            config,
            data_root,
            output,
            diag,
            manager,
            watcher,
            resolver,
            store,
        };
        for workspace in ctx.config.workspace.paths.clone() {
            ctx.scan_workspace(&workspace);
        }
        Ok(ctx)
    }

    /// Scan `workspace` and register its skills with the manager.
    pub fn scan_workspace(&self, workspace: &Path) -> usize {
        let skills = self.watcher.load_workspace_skills(workspace);
        let count = skills.len();
        self.manager.set_workspace_skills(workspace, skills);
        count
    }

    /// Scan, then keep the manager in sync with `workspace` until unwatched.
    pub fn watch_workspace(&self, workspace: &Path) -> Result<bool> {
        self.scan_workspace(workspace);
        let manager = Arc::clone(&self.manager);
        self.watcher.watch_workspace(
            workspace,
            Arc::new(move |change| manager.apply_workspace_change(&change)),
        )
    }

    /// Stop watching `workspace` and drop its skills from the merged view.
    pub fn unwatch_workspace(&self, workspace: &Path) -> bool {
        let was_watching = self.watcher.unwatch_workspace(workspace);
        self.manager.remove_workspace(workspace);
        was_watching
    }

    #[must_use]
    pub const fn json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
