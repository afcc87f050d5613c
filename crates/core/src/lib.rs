//! # spook-hunt-core
//!
//! Game state for a location-anchored AR ghost hunt.
//!
//! ## Features
//!
//! - **Zone tracking**: GPS fixes in, debounced enter/exit transitions out
//! - **Ghost spawning**: population-capped waves placed on the zone disk
//! - **Hold-to-capture**: a timed charge that resolves exactly once
//! - **Inventory and progression**: capacity rules, points, levels, milestones
//! - **Checkpoint deposits**: token-validated banking with a volume bonus
//! - **Pluggable persistence and sync**: in-memory or SQLite stores, HTTP push
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use spook_hunt_core::prelude::*;
//!
//! let cfg = GameConfig::default();
//! let center = cfg.zone.center();
//! let mut session = HuntSession::new(
//!     cfg,
//!     Arc::new(MemoryStore::default()),
//!     Arc::new(NullSync),
//! )?;
//! session.start();
//!
//! // First fix inside the zone: the hunt is on and ghosts appear.
//! session.apply_fix(PositionFix {
//!     point: center,
//!     accuracy_m: 5.0,
//!     timestamp: Utc::now(),
//! });
//! assert_eq!(session.membership(), ZoneMembership::In);
//! assert!(!session.active_ghosts().is_empty());
//! # Ok::<(), spook_hunt_core::GameError>(())
//! ```

pub mod capture;
pub mod config;
pub mod containment;
pub mod error;
pub mod events;
pub mod ghost;
pub mod ids;
pub mod inventory;
pub mod position;
pub mod progress;
pub mod runtime;
pub mod session;
pub mod spawn;
pub mod store;
pub mod sync;

// Re-export the geo primitives from the field crate
pub use spook_hunt_field as field;

pub mod prelude {
    pub use crate::capture::{BeginOutcome, CaptureOutcome};
    pub use crate::config::GameConfig;
    pub use crate::containment::{ContainmentProcessor, DepositReceipt, DepositSummary};
    pub use crate::error::{GameError, Result};
    pub use crate::events::GameEvent;
    pub use crate::ghost::{DespawnReason, Ghost, GhostKind};
    pub use crate::ids::{GhostId, OwnerKey};
    pub use crate::inventory::{Inventory, InventoryItem, InventoryStats, SortOrder};
    pub use crate::position::{
        LocationError, LocationSource, PositionFix, PositionStream, ZoneMembership,
        ZoneTransition,
    };
    pub use crate::progress::{LevelUp, Milestone, PlayerProgress};
    pub use crate::runtime::{SessionCommand, SessionRuntime};
    pub use crate::session::{DepositOutcome, HudSnapshot, HuntSession, SessionPhase};
    pub use crate::spawn::GhostSpawner;
    pub use crate::store::{MemoryStore, PersistedState, Settings, SqliteStore, StateStore};
    pub use crate::sync::{DepositRecord, HttpSync, NullSync, SyncBackend};
}

pub use prelude::*;
