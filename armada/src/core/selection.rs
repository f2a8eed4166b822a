//! The persisted repository selection: the only entity with cross-run lifetime.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::identity::RepoId;

/// Durable record of discovery, filtering, cloning, and modification
/// membership for one owner scope.
///
/// Each sequence keeps insertion order and is deduplicated by identity.
/// `modified` is maintained by an external collaborator; this crate only
/// reads and writes the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub owner: String,
    pub discovered: Vec<RepoId>,
    pub filtered: Vec<RepoId>,
    pub cloned: Vec<RepoId>,
    pub modified: Vec<RepoId>,
}

impl Selection {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Replace the discovered set, pruning `filtered` so it stays a subset.
    pub fn set_discovered(&mut self, ids: Vec<RepoId>) {
        self.discovered = dedup(ids);
        self.filtered.retain(|id| self.discovered.contains(id));
    }

    pub fn set_filtered(&mut self, ids: Vec<RepoId>) {
        self.filtered = dedup(ids);
    }

    pub fn set_cloned(&mut self, ids: Vec<RepoId>) {
        self.cloned = dedup(ids);
    }

    /// Add to the cloned set; false if already present.
    pub fn add_cloned(&mut self, id: RepoId) -> bool {
        if self.cloned.contains(&id) {
            return false;
        }
        self.cloned.push(id);
        true
    }

    /// Remove from the cloned set; false if absent.
    pub fn remove_cloned(&mut self, id: &RepoId) -> bool {
        let before = self.cloned.len();
        self.cloned.retain(|existing| existing != id);
        self.cloned.len() != before
    }

    /// Every structural violation, reported together.
    pub fn invariant_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.owner.trim().is_empty() {
            errors.push("owner must not be empty".to_string());
        }
        for (label, ids) in [
            ("discovered", &self.discovered),
            ("filtered", &self.filtered),
            ("cloned", &self.cloned),
            ("modified", &self.modified),
        ] {
            for (index, id) in ids.iter().enumerate() {
                if ids[..index].contains(id) {
                    errors.push(format!("duplicate id {id} in {label}"));
                }
            }
        }
        for id in &self.filtered {
            if !self.discovered.contains(id) {
                errors.push(format!("filtered id {id} is not in discovered"));
            }
        }
        errors
    }

    pub fn validate(&self) -> Result<()> {
        let errors = self.invariant_errors();
        if errors.is_empty() {
            return Ok(());
        }
        bail!("selection invariants failed: {}", errors.join("; "));
    }
}

/// Keep the first occurrence of each identity, preserving order.
fn dedup(ids: Vec<RepoId>) -> Vec<RepoId> {
    let mut unique: Vec<RepoId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
