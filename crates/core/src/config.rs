//! Game configuration.
//!
//! Every recognized tuning knob lives here, with defaults matching the
//! Florianópolis deployment. Configs deserialize from JSON with any
//! subset of sections present; everything omitted falls back to the
//! defaults below.

use chrono::Duration;
use geo::Point;
use serde::{Deserialize, Serialize};
use spook_hunt_field::{Checkpoint, CheckpointRegistry, Zone};

use crate::error::{GameError, Result};
use crate::ghost::GhostKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub zone: ZoneConfig,
    pub inventory: InventoryConfig,
    pub capture: CaptureConfig,
    pub ghosts: GhostConfig,
    pub scoring: ScoringConfig,
    pub deposit: DepositConfig,
    pub milestones: MilestoneConfig,
    pub checkpoints: Vec<CheckpointConfig>,
    pub sync: SyncConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            zone: ZoneConfig::default(),
            inventory: InventoryConfig::default(),
            capture: CaptureConfig::default(),
            ghosts: GhostConfig::default(),
            scoring: ScoringConfig::default(),
            deposit: DepositConfig::default(),
            milestones: MilestoneConfig::default(),
            checkpoints: vec![CheckpointConfig::default()],
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub initial_slots: usize,
    pub bonus_slots: usize,
    /// Deposited-ghost count per bonus slot grant.
    pub bonus_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub duration_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub spawn_radius_m: f64,
    pub min_distance_m: f64,
    pub max_ghosts: usize,
    pub respawn_interval_ms: u64,
    /// Ghosts older than this are evicted on respawn ticks.
    pub lifetime_ms: u64,
    pub min_height_m: f32,
    pub max_height_m: f32,
    pub strong_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub normal_points: u32,
    pub strong_points: u32,
    pub level_bonus_factor: u32,
    pub points_per_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    /// Minimum ghosts in a single deposit to earn the bonus.
    pub bonus_min_ghosts: u32,
    pub bonus_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneConfig {
    pub patrol_vehicle: u32,
    pub companion_spirit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub token: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote sync is disabled when unset.
    pub base_url: Option<String>,
}

// ============================================================================
// Defaults (Florianópolis deployment)
// ============================================================================

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            lat: -27.63979808217616,
            lon: -48.66775914489331,
            radius_m: 100.0,
            name: "Florianópolis, SC".to_string(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            initial_slots: 10,
            bonus_slots: 5,
            bonus_threshold: 20,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            spawn_radius_m: 100.0,
            min_distance_m: 5.0,
            max_ghosts: 5,
            respawn_interval_ms: 30_000,
            lifetime_ms: 90_000,
            min_height_m: 1.0,
            max_height_m: 4.0,
            strong_chance: 0.2,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            normal_points: 10,
            strong_points: 25,
            level_bonus_factor: 2,
            points_per_level: 100,
        }
    }
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            bonus_min_ghosts: 10,
            bonus_rate: 0.1,
        }
    }
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            patrol_vehicle: 5,
            companion_spirit: 10,
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            token: "CONTAINMENT_UNIT_FLORIPA_001".to_string(),
            name: "Containment Unit".to_string(),
            lat: -27.63979808217616,
            lon: -48.66775914489331,
        }
    }
}

// ============================================================================
// Accessors and validation
// ============================================================================

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GameError::InvalidConfig(format!("config file unreadable: {e}")))?;
        Self::from_json(&raw)
    }

    pub fn zone(&self) -> Result<Zone> {
        Ok(Zone::new(self.zone.center(), self.zone.radius_m)?)
    }

    pub fn checkpoint_registry(&self) -> Result<CheckpointRegistry> {
        let checkpoints = self
            .checkpoints
            .iter()
            .map(|cp| Checkpoint::new(cp.token.as_str(), &cp.name, Point::new(cp.lon, cp.lat)))
            .collect();
        Ok(CheckpointRegistry::from_checkpoints(checkpoints)?)
    }

    pub fn validate(&self) -> Result<()> {
        fn bad(msg: impl Into<String>) -> Result<()> {
            Err(GameError::InvalidConfig(msg.into()))
        }

        if !self.zone.radius_m.is_finite() || self.zone.radius_m <= 0.0 {
            return bad(format!("zone radius_m must be positive, got {}", self.zone.radius_m));
        }
        if self.capture.duration_ms == 0 {
            return bad("capture duration_ms must be nonzero");
        }
        if self.capture.poll_interval_ms == 0 {
            return bad("capture poll_interval_ms must be nonzero");
        }
        if !self.ghosts.spawn_radius_m.is_finite() || self.ghosts.spawn_radius_m <= 0.0 {
            return bad("ghost spawn_radius_m must be positive");
        }
        if self.ghosts.min_distance_m < 0.0 {
            return bad("ghost min_distance_m must not be negative");
        }
        if self.ghosts.max_ghosts == 0 {
            return bad("ghost max_ghosts must be at least 1");
        }
        if self.ghosts.respawn_interval_ms == 0 {
            return bad("ghost respawn_interval_ms must be nonzero");
        }
        if self.ghosts.lifetime_ms == 0 {
            return bad("ghost lifetime_ms must be nonzero");
        }
        if self.ghosts.min_height_m > self.ghosts.max_height_m {
            return bad(format!(
                "ghost height range inverted: {} > {}",
                self.ghosts.min_height_m, self.ghosts.max_height_m
            ));
        }
        if !(0.0..=1.0).contains(&self.ghosts.strong_chance) {
            return bad("ghost strong_chance must be within 0..=1");
        }
        if self.inventory.bonus_threshold == 0 {
            return bad("inventory bonus_threshold must be nonzero");
        }
        if self.scoring.points_per_level == 0 {
            return bad("scoring points_per_level must be nonzero");
        }
        if !(0.0..=1.0).contains(&self.deposit.bonus_rate) {
            return bad("deposit bonus_rate must be within 0..=1");
        }
        Ok(())
    }
}

impl ZoneConfig {
    pub fn center(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

impl CaptureConfig {
    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms as i64)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

impl GhostConfig {
    pub fn respawn_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.respawn_interval_ms)
    }

    pub fn lifetime(&self) -> Duration {
        Duration::milliseconds(self.lifetime_ms as i64)
    }
}

impl ScoringConfig {
    /// Points minted into an inventory item at capture time.
    pub fn capture_points(&self, kind: GhostKind, level: u32) -> u32 {
        let base = match kind {
            GhostKind::Normal => self.normal_points,
            GhostKind::Strong => self.strong_points,
        };
        base + level * self.level_bonus_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_checkpoint_is_floripa_unit() {
        let cfg = GameConfig::default();
        let registry = cfg.checkpoint_registry().unwrap();
        assert!(registry.validate("CONTAINMENT_UNIT_FLORIPA_001").is_some());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg = GameConfig::from_json(r#"{ "zone": { "radius_m": 50.0 } }"#).unwrap();
        assert_eq!(cfg.zone.radius_m, 50.0);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.zone.lat, -27.63979808217616);
        assert_eq!(cfg.inventory.initial_slots, 10);
        assert_eq!(cfg.capture.duration_ms, 5_000);
    }

    #[test]
    fn test_rejects_zero_radius() {
        let err = GameConfig::from_json(r#"{ "zone": { "radius_m": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_inverted_height_range() {
        let mut cfg = GameConfig::default();
        cfg.ghosts.min_height_m = 5.0;
        cfg.ghosts.max_height_m = 2.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_max_ghosts() {
        let mut cfg = GameConfig::default();
        cfg.ghosts.max_ghosts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_capture_points_scale_with_level() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.capture_points(GhostKind::Normal, 1), 12);
        assert_eq!(scoring.capture_points(GhostKind::Strong, 1), 27);
        assert_eq!(scoring.capture_points(GhostKind::Normal, 3), 16);
    }
}
