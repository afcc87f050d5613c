//! # spook-hunt-field
//!
//! Geographic primitives for location-anchored gameplay.
//!
//! ## Features
//!
//! - **Geodesy**: Haversine distance, bearings, and destination points
//! - **Play zones**: Circular geofences with range reports for HUD guidance
//! - **Checkpoints**: Token validation plus R-tree proximity queries
//! - **Scene projection**: Geographic offsets mapped into a local AR frame
//!
//! ## Example
//!
//! ```
//! use spook_hunt_field::prelude::*;
//! use geo::Point;
//!
//! let center = Point::new(-48.66775914489331, -27.63979808217616);
//! let zone = Zone::new(center, 100.0)?;
//!
//! let registry = CheckpointRegistry::from_checkpoints(vec![Checkpoint::new(
//!     "CONTAINMENT_UNIT_FLORIPA_001",
//!     "Containment Unit",
//!     center,
//! )])?;
//!
//! // A player 45m northeast of the center is inside the hunt area.
//! let player = geodesy::destination(center, 45.0, 45.0);
//! assert!(zone.contains(player));
//! assert!(registry.validate("CONTAINMENT_UNIT_FLORIPA_001").is_some());
//! # Ok::<(), spook_hunt_field::FieldError>(())
//! ```

pub mod checkpoint;
pub mod error;
pub mod geodesy;
pub mod scene;
pub mod zone;

// Re-exports for convenience
pub mod prelude {
    pub use crate::checkpoint::{Checkpoint, CheckpointRegistry, CheckpointToken};
    pub use crate::error::{FieldError, Result as FieldResult};
    pub use crate::geodesy;
    pub use crate::scene::SceneProjector;
    pub use crate::zone::{format_distance, RangeReport, Zone};
}

pub use prelude::*;
