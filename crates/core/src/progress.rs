//! Player progression: points, derived level, deposits, milestones.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::config::{MilestoneConfig, ScoringConfig};

/// Level is derived from points, never stored authority on its own.
pub fn level_for_points(points: u32, points_per_level: u32) -> u32 {
    points / points_per_level + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

/// Unlockable presentation hooks tied to deposit counts. Not
/// gameplay-critical; each unlocks exactly once.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Milestone {
    PatrolVehicle,
    CompanionSpirit,
}

impl Milestone {
    fn threshold(self, cfg: &MilestoneConfig) -> u32 {
        match self {
            Milestone::PatrolVehicle => cfg.patrol_vehicle,
            Milestone::CompanionSpirit => cfg.companion_spirit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProgress {
    pub points: u32,
    pub level: u32,
    pub ghosts_deposited: u32,
    pub milestones: BTreeSet<Milestone>,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerProgress {
    pub fn new() -> Self {
        Self {
            points: 0,
            level: 1,
            ghosts_deposited: 0,
            milestones: BTreeSet::new(),
        }
    }

    /// Credits points and recomputes the level. Points only ever
    /// grow, so the level never decreases.
    pub fn award(&mut self, points: u32, cfg: &ScoringConfig) -> Option<LevelUp> {
        self.points += points;
        let target = level_for_points(self.points, cfg.points_per_level);
        if target > self.level {
            let from = self.level;
            self.level = target;
            tracing::info!(from, to = target, "level up");
            Some(LevelUp { from, to: target })
        } else {
            None
        }
    }

    pub fn record_deposit(&mut self, ghost_count: u32) {
        self.ghosts_deposited += ghost_count;
    }

    /// Newly crossed milestone thresholds, in declaration order.
    pub fn unlock_milestones(&mut self, cfg: &MilestoneConfig) -> Vec<Milestone> {
        Milestone::iter()
            .filter(|m| self.ghosts_deposited >= m.threshold(cfg) && self.milestones.insert(*m))
            .collect()
    }

    /// Login-time reconciliation with persisted or remote totals:
    /// field-wise maxima, milestone union, level re-derived from the
    /// merged points so the invariant holds whatever the inputs were.
    pub fn merge_remote(&mut self, remote: &PlayerProgress, cfg: &ScoringConfig) {
        self.points = self.points.max(remote.points);
        self.ghosts_deposited = self.ghosts_deposited.max(remote.ghosts_deposited);
        self.milestones.extend(remote.milestones.iter().copied());
        self.level = self
            .level
            .max(remote.level)
            .max(level_for_points(self.points, cfg.points_per_level));
    }
}
