//! Ghost entities.

use chrono::{DateTime, Utc};
use geo::Point;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ids::GhostId;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GhostKind {
    Normal,
    Strong,
}

/// A capturable entity carrying both a geographic anchor and the
/// local scene offset it was rendered at when spawned.
#[derive(Debug, Clone)]
pub struct Ghost {
    pub id: GhostId,
    pub geo: Point,
    pub local: Vec3,
    pub kind: GhostKind,
    pub spawned_at: DateTime<Utc>,
}

/// Why a ghost left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DespawnReason {
    Captured,
    ZoneExited,
    Expired,
    SessionStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(serde_json::to_string(&GhostKind::Normal).unwrap(), "\"normal\"");
        assert_eq!(serde_json::to_string(&GhostKind::Strong).unwrap(), "\"strong\"");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(GhostKind::Strong.to_string(), "strong");
        assert_eq!(DespawnReason::ZoneExited.to_string(), "zone_exited");
    }
}
