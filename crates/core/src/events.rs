//! Typed domain events.
//!
//! The session broadcasts every externally visible state change on a
//! tokio broadcast channel. Presentation layers subscribe and render;
//! lagged receivers skip missed events rather than stalling the game.

use glam::Vec3;
use tokio::sync::broadcast;

use crate::capture::CaptureOutcome;
use crate::containment::DepositReceipt;
use crate::ghost::{DespawnReason, GhostKind};
use crate::ids::GhostId;
use crate::progress::{LevelUp, Milestone};

#[derive(Debug, Clone)]
pub enum GameEvent {
    ZoneEntered { distance_m: f64 },
    ZoneExited { distance_m: f64 },
    /// Location errored out; membership is unknown until the next fix.
    MembershipLost,
    GhostSpawned { id: GhostId, kind: GhostKind, local: Vec3 },
    GhostDespawned { id: GhostId, reason: DespawnReason },
    CaptureStarted { target: GhostId },
    CaptureProgress { target: GhostId, fraction: f32 },
    CaptureResolved { outcome: CaptureOutcome },
    InventoryChanged { len: usize, capacity: usize },
    DepositCompleted { receipt: DepositReceipt },
    LevelUp(LevelUp),
    MilestoneUnlocked(Milestone),
    /// A state save failed; in-memory state stays authoritative.
    StorageWarning { detail: String },
    SyncWarning { detail: String },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Send failures mean no subscribers, which is fine.
    pub fn emit(&self, event: GameEvent) {
        tracing::trace!(?event, "emit");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
