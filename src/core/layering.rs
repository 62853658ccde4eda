//! Tier layering and conflict resolution
//!
//! The same skill id can exist in several tiers. The merger keeps one winner
//! per id, chosen by an injectable [`TierPriority`] policy, and records which
//! tiers lost for each id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::skill::{Skill, Tier};

/// Priority assigned to tiers a policy does not know.
pub const UNKNOWN_PRIORITY: u32 = 99;

// =============================================================================
// PRIORITY POLICY
// =============================================================================

/// Maps a tier to its priority. Smaller numbers win.
pub trait TierPriority: Send + Sync + fmt::Debug {
    fn priority(&self, tier: Tier) -> u32;
}

/// extra > bundled > managed > workspace > unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPriority;

impl TierPriority for DefaultPriority {
    fn priority(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Extra => 1,
            Tier::Bundled => 2,
            Tier::Managed => 3,
            Tier::Workspace => 4,
            Tier::Unknown => UNKNOWN_PRIORITY,
        }
    }
}

/// A policy built from an explicit ordering, highest precedence first.
#[derive(Debug, Clone)]
pub struct OrderedPriority {
    order: Vec<Tier>,
}

impl OrderedPriority {
    #[must_use]
    pub fn new(order: Vec<Tier>) -> Self {
        Self { order }
    }
}

impl TierPriority for OrderedPriority {
    fn priority(&self, tier: Tier) -> u32 {
        self.order
            .iter()
            .position(|t| *t == tier)
            .and_then(|idx| u32::try_from(idx + 1).ok())
            .unwrap_or(UNKNOWN_PRIORITY)
    }
}

// =============================================================================
// MERGED VIEW
// =============================================================================

/// One winner per id, plus the tiers each winner shadowed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedSkillSet {
    pub skills: BTreeMap<String, Skill>,
    /// Tiers overridden per id, in the order they lost
    pub overrides: BTreeMap<String, Vec<Tier>>,
    /// Number of current winners contributed by each tier
    pub tier_counts: BTreeMap<Tier, usize>,
}

impl MergedSkillSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    #[must_use]
    pub fn overrides_for(&self, id: &str) -> &[Tier] {
        self.overrides.get(id).map_or(&[], Vec::as_slice)
    }
}

// =============================================================================
// MERGER
// =============================================================================

/// Builds a [`MergedSkillSet`] from per-tier lists.
///
/// Not synchronized. Callers wrap it in their own lock.
#[derive(Debug)]
pub struct PriorityMerger {
    policy: Arc<dyn TierPriority>,
    merged: MergedSkillSet,
    dirty: bool,
}

impl Default for PriorityMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityMerger {
    /// Merger using [`DefaultPriority`]. Starts dirty.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Arc::new(DefaultPriority))
    }

    #[must_use]
    pub fn with_policy(policy: Arc<dyn TierPriority>) -> Self {
        Self {
            policy,
            merged: MergedSkillSet::default(),
            dirty: true,
        }
    }

    #[must_use]
    pub fn priority(&self, tier: Tier) -> u32 {
        self.policy.priority(tier)
    }

    /// Offer one skill. Returns true when it became the winner for its id.
    pub fn add(&mut self, skill: Skill) -> bool {
        let incoming = self.policy.priority(skill.tier);
        let merged = &mut self.merged;

        let Some(existing) = merged.skills.get(&skill.id) else {
            *merged.tier_counts.entry(skill.tier).or_insert(0) += 1;
            merged.skills.insert(skill.id.clone(), skill);
            return true;
        };

        let existing_tier = existing.tier;
        if incoming < self.policy.priority(existing_tier) {
            decrement(&mut merged.tier_counts, existing_tier);
            *merged.tier_counts.entry(skill.tier).or_insert(0) += 1;
            merged
                .overrides
                .entry(skill.id.clone())
                .or_default()
                .push(existing_tier);
            merged.skills.insert(skill.id.clone(), skill);
            true
        } else {
            merged
                .overrides
                .entry(skill.id.clone())
                .or_default()
                .push(skill.tier);
            false
        }
    }

    /// Add every list in caller order.
    pub fn merge<'a, L, I>(&mut self, lists: L)
    where
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = &'a Skill>,
    {
        for list in lists {
            for skill in list {
                self.add(skill.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.merged = MergedSkillSet::default();
    }

    pub const fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute from scratch when dirty. `lists` is only called on a rebuild.
    ///
    /// Returns true when a rebuild happened.
    pub fn rebuild_if_dirty<'a, F, L, I>(&mut self, lists: F) -> bool
    where
        F: FnOnce() -> L,
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = &'a Skill>,
    {
        if !self.dirty {
            return false;
        }
        self.clear();
        self.merge(lists());
        self.dirty = false;
        true
    }

    #[must_use]
    pub const fn merged(&self) -> &MergedSkillSet {
        &self.merged
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.merged.get(id)
    }

    /// Winners ordered by (priority, name, id).
    #[must_use]
    pub fn list_sorted(&self) -> Vec<&Skill> {
        let mut out: Vec<&Skill> = self.merged.skills.values().collect();
        out.sort_by(|a, b| {
            self.policy
                .priority(a.tier)
                .cmp(&self.policy.priority(b.tier))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }
}

fn decrement(counts: &mut BTreeMap<Tier, usize>, tier: Tier) {
    if let Some(count) = counts.get_mut(&tier) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(&tier);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
