//! Skill catalog manager.
//!
//! Owns the canonical per-tier records and wires the merger, the loader and
//! catalog persistence together. Each mutation runs as one unit under the
//! catalog write lock: mutate, persist, mark the merged view dirty,
//! invalidate the loader entry. A failed persist restores the previous
//! in-memory state before the error is returned.
//!
//! Lock order is always catalog state, then merger.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::bundled::bundled_skills;
use crate::core::disclosure::{ProgressiveLoader, SkillLookup};
use crate::core::layering::{DefaultPriority, MergedSkillSet, PriorityMerger, TierPriority};
use crate::core::skill::{CreateSkillRequest, Skill, Tier, UpdateSkillRequest, default_command};
use crate::diagnostics::Diagnostics;
use crate::error::{HubError, Result};
use crate::storage::{CatalogSnapshot, CatalogStore};
use crate::workspace::WorkspaceChange;

#[derive(Debug, Default, Clone)]
struct CatalogState {
    extra: Vec<Skill>,
    bundled: Vec<Skill>,
    managed: Vec<Skill>,
    /// Persisted records whose tier this build does not recognize
    other: Vec<Skill>,
    workspaces: BTreeMap<PathBuf, Vec<Skill>>,
}

impl CatalogState {
    fn tier_lists(&self) -> Vec<&[Skill]> {
        let mut lists = vec![
            self.extra.as_slice(),
            self.bundled.as_slice(),
            self.managed.as_slice(),
        ];
        lists.extend(self.workspaces.values().map(Vec::as_slice));
        lists.push(self.other.as_slice());
        lists
    }

    fn list_mut(&mut self, tier: Tier) -> Option<&mut Vec<Skill>> {
        match tier {
            Tier::Extra => Some(&mut self.extra),
            Tier::Bundled => Some(&mut self.bundled),
            Tier::Managed => Some(&mut self.managed),
            Tier::Unknown => Some(&mut self.other),
            Tier::Workspace => None,
        }
    }

    /// Ids that block a create: everything except workspace skills.
    fn is_taken(&self, id: &str) -> bool {
        [&self.extra, &self.bundled, &self.managed, &self.other]
            .iter()
            .any(|list| list.iter().any(|s| s.id == id))
    }

    fn snapshot(&self) -> CatalogSnapshot {
        let skills = self
            .extra
            .iter()
            .chain(&self.managed)
            .chain(&self.other)
            .filter(|s| !s.built_in)
            .cloned()
            .collect();
        let builtin_enabled = self
            .bundled
            .iter()
            .filter(|s| !s.enabled)
            .map(|s| (s.id.clone(), s.enabled))
            .collect();
        CatalogSnapshot {
            skills,
            builtin_enabled,
        }
    }
}

/// Catalog state plus the merged view derived from it.
struct Catalog {
    state: RwLock<CatalogState>,
    merger: Mutex<PriorityMerger>,
}

impl Catalog {
    /// Run `f` against an up-to-date merged view.
    fn with_view<R>(&self, f: impl FnOnce(&PriorityMerger) -> R) -> R {
        let state = self.state.read();
        let mut merger = self.merger.lock();
        merger.rebuild_if_dirty(|| state.tier_lists());
        f(&merger)
    }
}

impl SkillLookup for Catalog {
    fn lookup(&self, id: &str) -> Option<Skill> {
        self.with_view(|merger| merger.get(id).cloned())
    }
}

/// Front door for every catalog operation.
pub struct SkillManager {
    catalog: Arc<Catalog>,
    store: Arc<dyn CatalogStore>,
    loader: Arc<ProgressiveLoader>,
    diag: Diagnostics,
}

impl std::fmt::Debug for SkillManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillManager")
            .field("skills", &self.catalog.with_view(|m| m.merged().len()))
            .finish_non_exhaustive()
    }
}

impl SkillManager {
    /// Load the catalog from `store` on top of the compiled-in bundled tier.
    pub fn new(store: Arc<dyn CatalogStore>, diag: Diagnostics) -> Result<Self> {
        Self::with_parts(store, bundled_skills(), Arc::new(DefaultPriority), diag)
    }

    /// Build with an explicit bundled tier and priority policy.
    pub fn with_parts(
        store: Arc<dyn CatalogStore>,
        bundled: Vec<Skill>,
        policy: Arc<dyn TierPriority>,
        diag: Diagnostics,
    ) -> Result<Self> {
        let snapshot = store.load()?;
        let mut state = CatalogState::default();

        for mut skill in bundled {
            skill.tier = Tier::Bundled;
            skill.built_in = true;
            if let Some(enabled) = snapshot.builtin_enabled.get(&skill.id) {
                skill.enabled = *enabled;
            }
            push_unique(&mut state.bundled, skill, &diag);
        }

        for mut skill in snapshot.skills {
            skill.built_in = false;
            // The bundled list is never written back.
            if skill.tier == Tier::Bundled {
                diag.scope(|| {
                    warn!(skill = %skill.id, "stored skill claims the bundled tier; keeping it as extra");
                });
                skill.tier = Tier::Extra;
            }
            let tier = skill.tier;
            match state.list_mut(tier) {
                Some(list) => push_unique(list, skill, &diag),
                None => diag.scope(|| {
                    warn!(skill = %skill.id, tier = %tier, "ignoring stored skill with non-persisted tier");
                }),
            }
        }

        diag.scope(|| {
            info!(
                extra = state.extra.len(),
                bundled = state.bundled.len(),
                managed = state.managed.len(),
                "catalog loaded"
            );
        });

        let catalog = Arc::new(Catalog {
            state: RwLock::new(state),
            merger: Mutex::new(PriorityMerger::with_policy(policy)),
        });
        let loader = Arc::new(ProgressiveLoader::new(
            Arc::clone(&catalog) as Arc<dyn SkillLookup>,
            diag.clone(),
        ));

        Ok(Self {
            catalog,
            store,
            loader,
            diag,
        })
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create an extra (default) or managed skill.
    pub fn create(&self, req: CreateSkillRequest) -> Result<Skill> {
        let skill = req.into_skill()?;
        let id = skill.id.clone();
        let tier = skill.tier;

        let mut state = self.catalog.state.write();
        if state.is_taken(&id) {
            return Err(HubError::AlreadyExists(id));
        }
        let previous = state.clone_tier(tier);
        state
            .list_mut(tier)
            .ok_or_else(|| HubError::ValidationFailed(format!("cannot create in tier {tier}")))?
            .push(skill.clone());

        self.commit(&mut state, &id, tier, previous)?;
        self.diag
            .scope(|| info!(skill = %id, tier = %tier, "skill created"));
        Ok(skill)
    }

    /// Update the merged winner for `id`. Built-ins take only `enabled`.
    pub fn update(&self, id: &str, req: UpdateSkillRequest) -> Result<Skill> {
        let mut state = self.catalog.state.write();
        let tier = self.winner_tier(&state, id)?;
        if tier == Tier::Workspace {
            return Err(HubError::Forbidden(format!(
                "{id} is a workspace skill; edit its SKILL.md instead"
            )));
        }

        let previous = state.clone_tier(tier);
        let list = state
            .list_mut(tier)
            .ok_or_else(|| HubError::NotFound(id.to_string()))?;
        let record = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| HubError::NotFound(id.to_string()))?;
        let mut updated = record.clone();
        req.apply_to(&mut updated)?;
        *record = updated.clone();

        self.commit(&mut state, id, tier, previous)?;
        self.diag
            .scope(|| info!(skill = %id, tier = %tier, "skill updated"));
        Ok(updated)
    }

    /// Delete the merged winner for `id`.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.catalog.state.write();
        let tier = self.winner_tier(&state, id)?;
        if tier == Tier::Workspace {
            return Err(HubError::Forbidden(format!(
                "{id} is a workspace skill; remove its directory instead"
            )));
        }

        let previous = state.clone_tier(tier);
        let list = state
            .list_mut(tier)
            .ok_or_else(|| HubError::NotFound(id.to_string()))?;
        let idx = list
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| HubError::NotFound(id.to_string()))?;
        if list[idx].built_in {
            return Err(HubError::Forbidden(format!(
                "{id} is built-in and can only be enabled or disabled"
            )));
        }
        list.remove(idx);

        self.commit(&mut state, id, tier, previous)?;
        self.diag
            .scope(|| info!(skill = %id, tier = %tier, "skill deleted"));
        Ok(())
    }

    /// Copy the merged winner for `id` into a new extra skill.
    pub fn clone_skill(&self, id: &str, new_id: &str, new_name: &str) -> Result<Skill> {
        let source = self.get(id)?;
        let mut req = CreateSkillRequest::from(source);
        req.id = new_id.to_string();
        req.name = new_name.to_string();
        req.command = Some(default_command(new_id));
        req.tier = Some(Tier::Extra);
        req.enabled = Some(true);
        self.create(req)
    }

    /// Persist, then mark dirty and invalidate. Restores `previous` on failure.
    fn commit(
        &self,
        state: &mut CatalogState,
        id: &str,
        tier: Tier,
        previous: Vec<Skill>,
    ) -> Result<()> {
        if let Err(err) = self.store.save(&state.snapshot()) {
            if let Some(list) = state.list_mut(tier) {
                *list = previous;
            }
            self.diag
                .scope(|| warn!(skill = %id, error = %err, "catalog write failed; change rolled back"));
            return Err(err);
        }
        self.catalog.merger.lock().mark_dirty();
        self.loader.invalidate(id);
        Ok(())
    }

    /// Tier of the merged winner for `id`, rebuilding the view if needed.
    fn winner_tier(&self, state: &CatalogState, id: &str) -> Result<Tier> {
        let mut merger = self.catalog.merger.lock();
        merger.rebuild_if_dirty(|| state.tier_lists());
        merger
            .get(id)
            .map(|s| s.tier)
            .ok_or_else(|| HubError::NotFound(id.to_string()))
    }

    // =========================================================================
    // WORKSPACE TIER
    // =========================================================================

    /// Replace the skill set of one workspace.
    pub fn set_workspace_skills(&self, workspace: &Path, skills: Vec<Skill>) {
        let mut state = self.catalog.state.write();
        let skills: Vec<Skill> = skills
            .into_iter()
            .map(|s| as_workspace_skill(s, workspace))
            .collect();
        let mut touched: BTreeSet<String> = skills.iter().map(|s| s.id.clone()).collect();
        if let Some(old) = state.workspaces.insert(workspace.to_path_buf(), skills) {
            touched.extend(old.into_iter().map(|s| s.id));
        }
        self.after_workspace_change(&touched);
        self.diag.scope(|| {
            debug!(workspace = %workspace.display(), touched = touched.len(), "workspace skills replaced");
        });
    }

    /// Apply one debounced change notification.
    pub fn apply_workspace_change(&self, change: &WorkspaceChange) {
        let mut state = self.catalog.state.write();
        let list = state
            .workspaces
            .entry(change.workspace.clone())
            .or_default();
        let mut touched = BTreeSet::new();

        for id in &change.removed {
            list.retain(|s| &s.id != id);
            touched.insert(id.clone());
        }
        for skill in change.added.iter().chain(&change.updated) {
            let skill = as_workspace_skill(skill.clone(), &change.workspace);
            touched.insert(skill.id.clone());
            match list.iter_mut().find(|s| s.id == skill.id) {
                Some(existing) => *existing = skill,
                None => list.push(skill),
            }
        }

        self.after_workspace_change(&touched);
        self.diag.scope(|| {
            info!(
                workspace = %change.workspace.display(),
                added = change.added.len(),
                updated = change.updated.len(),
                removed = change.removed.len(),
                "workspace change applied"
            );
        });
    }

    /// Drop every skill of one workspace.
    pub fn remove_workspace(&self, workspace: &Path) {
        let mut state = self.catalog.state.write();
        if let Some(old) = state.workspaces.remove(workspace) {
            let touched: BTreeSet<String> = old.into_iter().map(|s| s.id).collect();
            self.after_workspace_change(&touched);
        }
    }

    /// Must be called with the catalog write lock held.
    fn after_workspace_change(&self, touched: &BTreeSet<String>) {
        self.catalog.merger.lock().mark_dirty();
        for id in touched {
            self.loader.invalidate(id);
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// The merged winner for `id`.
    pub fn get(&self, id: &str) -> Result<Skill> {
        self.catalog
            .lookup(id)
            .ok_or_else(|| HubError::NotFound(id.to_string()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.catalog.with_view(|m| m.get(id).is_some())
    }

    /// Every merged skill, in display order.
    #[must_use]
    pub fn list(&self) -> Vec<Skill> {
        self.list_where(|_| true)
    }

    #[must_use]
    pub fn list_enabled(&self) -> Vec<Skill> {
        self.list_where(|s| s.enabled)
    }

    /// Case-insensitive category match.
    #[must_use]
    pub fn list_by_category(&self, category: &str) -> Vec<Skill> {
        self.list_where(|s| s.category.eq_ignore_ascii_case(category))
    }

    /// Merged winners that came from `tier`.
    #[must_use]
    pub fn list_by_tier(&self, tier: Tier) -> Vec<Skill> {
        self.list_where(|s| s.tier == tier)
    }

    fn list_where(&self, keep: impl Fn(&Skill) -> bool) -> Vec<Skill> {
        self.catalog.with_view(|merger| {
            merger
                .list_sorted()
                .into_iter()
                .filter(|s| keep(s))
                .cloned()
                .collect()
        })
    }

    /// Ids in the merged view.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<String> {
        self.catalog
            .with_view(|m| m.merged().skills.keys().cloned().collect())
    }

    #[must_use]
    pub fn merged_view(&self) -> MergedSkillSet {
        self.catalog.with_view(|m| m.merged().clone())
    }

    /// Tiers shadowed by the winner for `id`.
    #[must_use]
    pub fn overrides(&self, id: &str) -> Vec<Tier> {
        self.catalog
            .with_view(|m| m.merged().overrides_for(id).to_vec())
    }

    #[must_use]
    pub fn tier_counts(&self) -> BTreeMap<Tier, usize> {
        self.catalog.with_view(|m| m.merged().tier_counts.clone())
    }

    /// Watched workspace roots with at least a registered skill set.
    #[must_use]
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.catalog.state.read().workspaces.keys().cloned().collect()
    }

    #[must_use]
    pub fn loader(&self) -> Arc<ProgressiveLoader> {
        Arc::clone(&self.loader)
    }

    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }
}

impl CatalogState {
    fn clone_tier(&self, tier: Tier) -> Vec<Skill> {
        match tier {
            Tier::Extra => self.extra.clone(),
            Tier::Bundled => self.bundled.clone(),
            Tier::Managed => self.managed.clone(),
            Tier::Unknown => self.other.clone(),
            Tier::Workspace => Vec::new(),
        }
    }
}

fn as_workspace_skill(mut skill: Skill, workspace: &Path) -> Skill {
    skill.tier = Tier::Workspace;
    skill.built_in = false;
    skill.source_path = Some(workspace.to_path_buf());
    skill
}

fn push_unique(list: &mut Vec<Skill>, skill: Skill, diag: &Diagnostics) {
    if list.iter().any(|s| s.id == skill.id) {
        diag.scope(|| warn!(skill = %skill.id, tier = %skill.tier, "duplicate id in tier; keeping the first"));
        return;
    }
    list.push(skill);
}
