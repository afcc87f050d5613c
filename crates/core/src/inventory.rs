//! Bounded, owner-scoped ghost inventory.
//!
//! Capacity is a function of deposit progress and is computed in
//! exactly one place, [`Inventory::capacity`]. Items are tagged with
//! their owner at write time; loading a persisted inventory filters
//! to the active owner so switching identities yields disjoint views.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::InventoryConfig;
use crate::error::{GameError, Result};
use crate::ghost::GhostKind;
use crate::ids::{GhostId, OwnerKey};
use crate::progress::PlayerProgress;

/// Immutable record of one captured ghost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub ghost_id: GhostId,
    pub kind: GhostKind,
    pub captured_at: DateTime<Utc>,
    pub points: u32,
    pub owner: OwnerKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryStats {
    pub count: usize,
    pub by_kind: HashMap<GhostKind, usize>,
    pub total_points: u32,
    /// Rounded to the nearest point; 0 when empty.
    pub average_points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SortOrder {
    /// Most recently captured first.
    Newest,
    /// Highest points first.
    Points,
    /// Alphabetical by kind.
    Kind,
}

impl Inventory {
    /// Slots available at a given deposit count. The only place the
    /// capacity formula lives.
    pub fn capacity(progress: &PlayerProgress, cfg: &InventoryConfig) -> usize {
        cfg.initial_slots
            + (progress.ghosts_deposited / cfg.bonus_threshold) as usize * cfg.bonus_slots
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self, progress: &PlayerProgress, cfg: &InventoryConfig) -> bool {
        self.items.len() >= Self::capacity(progress, cfg)
    }

    pub fn total_points(&self) -> u32 {
        self.items.iter().map(|i| i.points).sum()
    }

    /// Fails without mutating when the inventory is at capacity.
    pub fn add(
        &mut self,
        item: InventoryItem,
        progress: &PlayerProgress,
        cfg: &InventoryConfig,
    ) -> Result<()> {
        let capacity = Self::capacity(progress, cfg);
        if self.items.len() >= capacity {
            return Err(GameError::CapacityExceeded {
                len: self.items.len(),
                capacity,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: &GhostId) -> Option<InventoryItem> {
        let idx = self.items.iter().position(|i| &i.ghost_id == id)?;
        Some(self.items.remove(idx))
    }

    /// Drains every item, returning them (deposit path).
    pub fn clear(&mut self) -> Vec<InventoryItem> {
        std::mem::take(&mut self.items)
    }

    /// Drops items belonging to anyone but `owner`.
    pub fn retain_owner(&mut self, owner: &OwnerKey) {
        self.items.retain(|i| &i.owner == owner);
    }

    pub fn stats(&self) -> InventoryStats {
        let total_points = self.total_points();
        let average_points = if self.items.is_empty() {
            0
        } else {
            (f64::from(total_points) / self.items.len() as f64).round() as u32
        };
        InventoryStats {
            count: self.items.len(),
            by_kind: self.items.iter().counts_by(|i| i.kind),
            total_points,
            average_points,
        }
    }

    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::Newest => self.items.sort_by(|a, b| b.captured_at.cmp(&a.captured_at)),
            SortOrder::Points => self.items.sort_by(|a, b| b.points.cmp(&a.points)),
            SortOrder::Kind => self
                .items
                .sort_by(|a, b| a.kind.as_ref().cmp(b.kind.as_ref())),
        }
    }
}
