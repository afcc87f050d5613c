//! The authoritative game session.
//!
//! [`HuntSession`] owns every piece of per-player state: the position
//! tracker, the spawner, the capture machine, the inventory, progression
//! and settings. All mutation goes through its methods, and every method
//! that depends on time takes the current instant as an argument so tests
//! and the simulator can drive the clock themselves. The async runtime in
//! [`crate::runtime`] wraps this type with real timers and a location
//! stream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spook_hunt_field::zone::format_distance;
use spook_hunt_field::RangeReport;

use crate::capture::{BeginOutcome, CaptureMachine, CaptureOutcome};
use crate::config::GameConfig;
use crate::containment::{ContainmentProcessor, DepositReceipt};
use crate::error::{GameError, Result};
use crate::events::{EventBus, GameEvent};
use crate::ghost::{DespawnReason, Ghost};
use crate::ids::OwnerKey;
use crate::inventory::{Inventory, InventoryItem};
use crate::position::{
    LocationError, PositionFix, PositionTracker, ZoneMembership, ZoneTransition,
};
use crate::progress::{LevelUp, Milestone, PlayerProgress};
use crate::spawn::GhostSpawner;
use crate::store::{PersistedState, Settings, StateStore};
use crate::sync::{DepositRecord, SyncBackend};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
}

/// What a checkpoint scan amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum DepositOutcome {
    Completed {
        receipt: DepositReceipt,
        level_up: Option<LevelUp>,
        milestones: Vec<Milestone>,
    },
    InvalidToken {
        scanned: String,
    },
    EmptyInventory,
}

/// Point-in-time view of the session for presentation layers.
#[derive(Debug, Clone)]
pub struct HudSnapshot {
    pub phase: SessionPhase,
    pub membership: ZoneMembership,
    pub range: Option<RangeReport>,
    /// Human-readable distance to the zone center, when a fix exists.
    pub range_text: Option<String>,
    pub active_ghosts: usize,
    pub inventory_len: usize,
    pub inventory_capacity: usize,
    pub points: u32,
    pub level: u32,
    pub ghosts_deposited: u32,
    /// Charge fraction of an in-flight capture.
    pub capture_progress: Option<f32>,
}

/// One player's hunt. Single-owner, mutated from one task at a time.
pub struct HuntSession {
    cfg: Arc<GameConfig>,
    owner: OwnerKey,
    phase: SessionPhase,
    tracker: PositionTracker,
    spawner: GhostSpawner,
    capture: CaptureMachine,
    inventory: Inventory,
    progress: PlayerProgress,
    settings: Settings,
    containment: ContainmentProcessor,
    store: Arc<dyn StateStore>,
    sync: Arc<dyn SyncBackend>,
    events: EventBus,
    rng: StdRng,
    /// Set when a save failed; the next periodic tick retries.
    dirty: bool,
}

impl HuntSession {
    pub fn new(
        cfg: GameConfig,
        store: Arc<dyn StateStore>,
        sync: Arc<dyn SyncBackend>,
    ) -> Result<Self> {
        cfg.validate()?;
        let zone = cfg.zone()?;
        let registry = cfg.checkpoint_registry()?;
        Ok(Self {
            tracker: PositionTracker::new(zone.clone()),
            spawner: GhostSpawner::new(&zone, &cfg.ghosts)?,
            capture: CaptureMachine::new(cfg.capture.duration()),
            inventory: Inventory::default(),
            progress: PlayerProgress::new(),
            settings: Settings::default(),
            containment: ContainmentProcessor::new(registry),
            store,
            sync,
            events: EventBus::default(),
            rng: StdRng::from_os_rng(),
            owner: OwnerKey::anonymous(),
            phase: SessionPhase::Idle,
            dirty: false,
            cfg: Arc::new(cfg),
        })
    }

    /// Deterministic spawn placement for tests and the simulator.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn membership(&self) -> ZoneMembership {
        self.tracker.membership()
    }

    pub fn range(&self) -> Option<RangeReport> {
        self.tracker.range()
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn active_ghosts(&self) -> &[Ghost] {
        self.spawner.active()
    }

    pub fn is_charging(&self) -> bool {
        self.capture.is_charging()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.dirty = true;
    }

    /// New receiver on the session event bus.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    // ==== lifecycle ====

    pub fn start(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Running;
            tracing::info!(owner = %self.owner, zone = %self.cfg.zone.name, "session started");
        }
    }

    /// Halts gameplay without discarding state. Any in-flight charge is
    /// cancelled; ghosts and inventory stay put.
    pub fn pause(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.phase = SessionPhase::Paused;
        self.cancel_charge();
        tracing::info!("session paused");
    }

    /// Picks the hunt back up. If the player is still inside the zone
    /// the field tops up right away instead of waiting out the next
    /// respawn tick.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.phase != SessionPhase::Paused {
            return;
        }
        self.phase = SessionPhase::Running;
        tracing::info!("session resumed");
        if self.tracker.membership() == ZoneMembership::In {
            if let Some(point) = self.tracker.current().map(|f| f.point) {
                self.spawn_now(now, point);
            }
        }
    }

    /// Ends the hunt: cancels any charge, despawns all ghosts and writes
    /// state out one last time.
    pub async fn stop(&mut self) {
        if self.phase == SessionPhase::Idle {
            return;
        }
        self.cancel_charge();
        self.despawn_all(DespawnReason::SessionStopped);
        self.phase = SessionPhase::Idle;
        self.persist().await;
        tracing::info!("session stopped");
    }

    // ==== identity ====

    /// Switches the session to `owner` and restores their saved state.
    ///
    /// Progress merges by field-wise maximum with whatever was loaded, so
    /// points earned before signing in are never lost. Inventory swaps to
    /// the stored one, filtered to items this owner captured. Calling with
    /// the current owner reloads from the store, which is how a fresh
    /// process picks its state back up.
    pub async fn login(&mut self, owner: OwnerKey) {
        self.cancel_charge();
        self.owner = owner;
        match self.store.load(&self.owner).await {
            Ok(Some(state)) => {
                let mut inventory = state.inventory;
                inventory.retain_owner(&self.owner);
                self.inventory = inventory;
                self.progress.merge_remote(&state.progress, &self.cfg.scoring);
                self.settings = state.settings;
                tracing::info!(owner = %self.owner, items = self.inventory.len(), "state restored");
            }
            Ok(None) => {
                self.inventory = Inventory::default();
                tracing::info!(owner = %self.owner, "no saved state, starting fresh");
            }
            Err(err) => {
                self.inventory = Inventory::default();
                self.warn_storage(err);
            }
        }
        self.emit_inventory_changed();
        self.persist().await;
    }

    /// Saves the outgoing owner's state, then drops back to an anonymous
    /// player with a clean slate. Device settings carry over.
    pub async fn logout(&mut self) {
        self.cancel_charge();
        self.persist().await;
        tracing::info!(owner = %self.owner, "logged out");
        self.owner = OwnerKey::anonymous();
        self.inventory = Inventory::default();
        self.progress = PlayerProgress::new();
        self.emit_inventory_changed();
    }

    // ==== position ====

    /// Feeds a location fix through the tracker and reacts to the zone
    /// transition, if any. Entering spawns an initial wave while the
    /// session is running; leaving cancels the charge and clears the
    /// field in every phase, so ghosts never outlive the player's
    /// presence in the zone.
    pub fn apply_fix(&mut self, fix: PositionFix) -> Option<ZoneTransition> {
        let transition = self.tracker.apply_fix(fix);
        match transition {
            Some(ZoneTransition::Entered) => {
                let distance_m = self.tracker.range().map_or(0.0, |r| r.distance_m);
                tracing::info!(distance_m, "entered the hunt zone");
                self.events.emit(GameEvent::ZoneEntered { distance_m });
                if self.phase == SessionPhase::Running {
                    self.spawn_now(fix.timestamp, fix.point);
                }
            }
            Some(ZoneTransition::Exited) => {
                let distance_m = self.tracker.range().map_or(0.0, |r| r.distance_m);
                tracing::info!(distance_m, "left the hunt zone");
                self.events.emit(GameEvent::ZoneExited { distance_m });
                self.cancel_charge();
                self.despawn_all(DespawnReason::ZoneExited);
            }
            Some(ZoneTransition::Lost) | None => {}
        }
        transition
    }

    /// Records a position failure. Membership drops to unknown, which
    /// blocks new captures; ghosts stay where they are until the player
    /// provably leaves the zone.
    pub fn apply_location_error(&mut self, err: &LocationError) {
        if self.tracker.apply_error(err).is_some() {
            tracing::warn!(error = %err, "position lost");
            self.events.emit(GameEvent::MembershipLost);
            self.cancel_charge();
        }
    }

    // ==== capture ====

    /// Trigger pressed: starts charging on the first capturable ghost.
    pub fn fire_pressed(&mut self, now: DateTime<Utc>) -> BeginOutcome {
        if self.phase != SessionPhase::Running {
            return BeginOutcome::Inactive;
        }
        let target = self.spawner.first_eligible().map(|g| g.id.clone());
        let outcome = self.capture.begin(now, self.tracker.membership(), target);
        if let BeginOutcome::Started { target } = &outcome {
            tracing::debug!(%target, "capture started");
            self.events.emit(GameEvent::CaptureStarted {
                target: target.clone(),
            });
        }
        outcome
    }

    /// Trigger released before full charge: the capture is abandoned.
    pub fn fire_released(&mut self) {
        self.cancel_charge();
    }

    /// Advances an in-flight charge. Emits progress; at full charge the
    /// capture resolves exactly once, to success or failure.
    pub async fn capture_tick(&mut self, now: DateTime<Utc>) {
        let Some(target) = self.capture.target().cloned() else {
            return;
        };
        let Some(fraction) = self.capture.progress(now) else {
            return;
        };
        self.events.emit(GameEvent::CaptureProgress {
            target: target.clone(),
            fraction,
        });
        if fraction < 1.0 {
            return;
        }
        self.capture.complete();

        let Some(kind) = self.spawner.get(&target).map(|g| g.kind) else {
            // Target despawned mid-charge.
            self.events.emit(GameEvent::CaptureResolved {
                outcome: CaptureOutcome::Cancelled { target },
            });
            return;
        };
        let points = self.cfg.scoring.capture_points(kind, self.progress.level);
        let item = InventoryItem {
            ghost_id: target.clone(),
            kind,
            captured_at: now,
            points,
            owner: self.owner.clone(),
        };
        match self.inventory.add(item, &self.progress, &self.cfg.inventory) {
            Ok(()) => {
                if self.spawner.take(&target).is_some() {
                    self.events.emit(GameEvent::GhostDespawned {
                        id: target.clone(),
                        reason: DespawnReason::Captured,
                    });
                }
                tracing::info!(%target, %kind, points, "ghost captured");
                self.events.emit(GameEvent::CaptureResolved {
                    outcome: CaptureOutcome::Success { target, points },
                });
                self.emit_inventory_changed();
                self.persist().await;
            }
            Err(err) => {
                // Inventory full. The ghost stays on the field.
                tracing::info!(%target, %err, "capture failed");
                self.events.emit(GameEvent::CaptureResolved {
                    outcome: CaptureOutcome::Failed { target },
                });
            }
        }
    }

    // ==== spawning ====

    /// Periodic upkeep: evicts expired ghosts, tops the field back up when
    /// the player is inside the zone, and retries any pending save.
    pub async fn respawn_tick(&mut self, now: DateTime<Utc>) {
        if self.phase != SessionPhase::Running {
            return;
        }
        for ghost in self.spawner.evict_expired(now) {
            self.events.emit(GameEvent::GhostDespawned {
                id: ghost.id,
                reason: DespawnReason::Expired,
            });
        }
        if let Some(target) = self.capture.target().cloned() {
            if self.spawner.get(&target).is_none() {
                self.cancel_charge();
            }
        }
        if self.tracker.membership() == ZoneMembership::In {
            if let Some(point) = self.tracker.current().map(|f| f.point) {
                self.spawn_now(now, point);
            }
        }
        if self.dirty {
            self.persist().await;
        }
    }

    // ==== deposits ====

    /// Handles a scanned checkpoint token end to end: validate, deposit,
    /// persist, then push the receipt upstream. Sync failures degrade to a
    /// warning; the deposit itself has already committed locally.
    pub async fn scan_token(
        &mut self,
        scanned: &str,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome> {
        let Some(checkpoint) = self.containment.validate_token(scanned) else {
            tracing::info!(scanned, "unknown checkpoint token");
            return Ok(DepositOutcome::InvalidToken {
                scanned: scanned.to_string(),
            });
        };
        let token = checkpoint.token.clone();
        let summary =
            match self
                .containment
                .deposit(&mut self.inventory, &mut self.progress, &self.cfg)
            {
                Ok(summary) => summary,
                Err(GameError::EmptyInventory) => return Ok(DepositOutcome::EmptyInventory),
                Err(err) => return Err(err),
            };
        self.events.emit(GameEvent::DepositCompleted {
            receipt: summary.receipt,
        });
        if let Some(level_up) = summary.level_up {
            self.events.emit(GameEvent::LevelUp(level_up));
        }
        for milestone in &summary.milestones {
            self.events.emit(GameEvent::MilestoneUnlocked(*milestone));
        }
        self.emit_inventory_changed();
        self.persist().await;

        let record = DepositRecord {
            owner: self.owner.to_string(),
            checkpoint: token.to_string(),
            ghost_count: summary.receipt.ghost_count,
            total_points: summary.receipt.total_points,
            bonus_points: summary.receipt.bonus_points,
            kind_counts: summary.kind_counts.clone(),
            deposited_at: now,
        };
        if let Err(err) = self.sync.push_deposit(&record).await {
            self.warn_sync(err);
        } else if let Err(err) = self.sync.push_totals(&self.owner, &self.progress).await {
            self.warn_sync(err);
        }
        Ok(DepositOutcome::Completed {
            receipt: summary.receipt,
            level_up: summary.level_up,
            milestones: summary.milestones,
        })
    }

    // ==== views ====

    pub fn hud(&self, now: DateTime<Utc>) -> HudSnapshot {
        let range = self.tracker.range();
        HudSnapshot {
            phase: self.phase,
            membership: self.tracker.membership(),
            range,
            range_text: range.map(|r| format_distance(r.distance_m)),
            active_ghosts: self.spawner.len(),
            inventory_len: self.inventory.len(),
            inventory_capacity: Inventory::capacity(&self.progress, &self.cfg.inventory),
            points: self.progress.points,
            level: self.progress.level,
            ghosts_deposited: self.progress.ghosts_deposited,
            capture_progress: self.capture.progress(now),
        }
    }

    // ==== internals ====

    fn spawn_now(&mut self, now: DateTime<Utc>, player: Point) {
        for ghost in self.spawner.spawn_batch(&mut self.rng, now, player) {
            self.events.emit(GameEvent::GhostSpawned {
                id: ghost.id,
                kind: ghost.kind,
                local: ghost.local,
            });
        }
    }

    fn despawn_all(&mut self, reason: DespawnReason) {
        for ghost in self.spawner.clear_all() {
            self.events.emit(GameEvent::GhostDespawned {
                id: ghost.id,
                reason,
            });
        }
    }

    fn cancel_charge(&mut self) {
        if let Some(target) = self.capture.cancel() {
            self.events.emit(GameEvent::CaptureResolved {
                outcome: CaptureOutcome::Cancelled { target },
            });
        }
    }

    async fn persist(&mut self) {
        let state = PersistedState {
            inventory: self.inventory.clone(),
            progress: self.progress.clone(),
            settings: self.settings,
        };
        match self.store.save(&self.owner, &state).await {
            Ok(()) => self.dirty = false,
            Err(err) => {
                self.dirty = true;
                self.warn_storage(err);
            }
        }
    }

    fn warn_storage(&self, err: GameError) {
        tracing::warn!(error = %err, "state store trouble, in-memory copy stays authoritative");
        self.events.emit(GameEvent::StorageWarning {
            detail: err.to_string(),
        });
    }

    fn warn_sync(&self, err: GameError) {
        tracing::warn!(error = %err, "sync push failed");
        self.events.emit(GameEvent::SyncWarning {
            detail: err.to_string(),
        });
    }

    fn emit_inventory_changed(&self) {
        self.events.emit(GameEvent::InventoryChanged {
            len: self.inventory.len(),
            capacity: Inventory::capacity(&self.progress, &self.cfg.inventory),
        });
    }
}
