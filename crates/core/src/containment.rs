//! Checkpoint token validation and deposit processing.
//!
//! A deposit converts the whole inventory into permanent score in one
//! synchronous mutation: callers never observe cleared items without
//! the matching point credit. Persistence and remote sync happen
//! write-behind after the fact and cannot roll the deposit back.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use spook_hunt_field::{Checkpoint, CheckpointRegistry};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::inventory::Inventory;
use crate::progress::{LevelUp, Milestone, PlayerProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub ghost_count: u32,
    /// Points credited to the player, bulk bonus included.
    pub total_points: u32,
    pub bonus_points: u32,
}

/// Everything a single deposit changed.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositSummary {
    pub receipt: DepositReceipt,
    pub level_up: Option<LevelUp>,
    pub milestones: Vec<Milestone>,
    /// Deposited ghosts per kind, for the sync record and the UI.
    pub kind_counts: BTreeMap<String, u32>,
}

#[derive(Debug)]
pub struct ContainmentProcessor {
    registry: CheckpointRegistry,
}

impl ContainmentProcessor {
    pub fn new(registry: CheckpointRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CheckpointRegistry {
        &self.registry
    }

    /// Exact-match token lookup; a miss mutates nothing.
    pub fn validate_token(&self, scanned: &str) -> Option<&Checkpoint> {
        self.registry.validate(scanned)
    }

    /// Drains the inventory into permanent score. Empty inventories
    /// are reported without touching any state.
    pub fn deposit(
        &self,
        inventory: &mut Inventory,
        progress: &mut PlayerProgress,
        cfg: &GameConfig,
    ) -> Result<DepositSummary> {
        if inventory.is_empty() {
            return Err(GameError::EmptyInventory);
        }

        let items = inventory.clear();
        let ghost_count = items.len() as u32;
        let base_points: u32 = items.iter().map(|i| i.points).sum();

        let bonus_points = if ghost_count >= cfg.deposit.bonus_min_ghosts {
            (f64::from(base_points) * cfg.deposit.bonus_rate).floor() as u32
        } else {
            0
        };
        let total_points = base_points + bonus_points;

        let level_up = progress.award(total_points, &cfg.scoring);
        progress.record_deposit(ghost_count);
        let milestones = progress.unlock_milestones(&cfg.milestones);

        let kind_counts = items
            .iter()
            .counts_by(|i| i.kind)
            .into_iter()
            .map(|(kind, n)| (kind.to_string(), n as u32))
            .collect();

        tracing::info!(ghost_count, total_points, bonus_points, "deposit completed");

        Ok(DepositSummary {
            receipt: DepositReceipt {
                ghost_count,
                total_points,
                bonus_points,
            },
            level_up,
            milestones,
            kind_counts,
        })
    }
}
