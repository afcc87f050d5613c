//! Hold-to-charge capture state machine.
//!
//! The machine only times the hold: it refuses to start without an
//! in-zone player and an eligible target, reports charge progress as
//! a fraction, and hands the target back on completion or
//! cancellation. Whether a full charge becomes a capture or a
//! capacity failure is the session's call, made against the inventory
//! at resolution time.

use chrono::{DateTime, Duration, Utc};

use crate::ids::GhostId;
use crate::position::ZoneMembership;

#[derive(Debug, Clone)]
struct Charge {
    target: GhostId,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CaptureMachine {
    duration: Duration,
    charge: Option<Charge>,
}

/// Result of a begin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    Started { target: GhostId },
    /// A charge is already running; the request is a no-op.
    AlreadyCharging,
    NotInZone,
    NoTarget,
    /// The session is idle or paused.
    Inactive,
}

/// How a charge ended, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Success { target: GhostId, points: u32 },
    /// Full charge with a full inventory.
    Failed { target: GhostId },
    Cancelled { target: GhostId },
}

impl CaptureMachine {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            charge: None,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.charge.is_some()
    }

    pub fn target(&self) -> Option<&GhostId> {
        self.charge.as_ref().map(|c| &c.target)
    }

    pub fn begin(
        &mut self,
        now: DateTime<Utc>,
        membership: ZoneMembership,
        target: Option<GhostId>,
    ) -> BeginOutcome {
        if self.charge.is_some() {
            return BeginOutcome::AlreadyCharging;
        }
        if membership != ZoneMembership::In {
            return BeginOutcome::NotInZone;
        }
        let Some(target) = target else {
            return BeginOutcome::NoTarget;
        };

        self.charge = Some(Charge {
            target: target.clone(),
            started_at: now,
        });
        BeginOutcome::Started { target }
    }

    /// Charge fraction in [0, 1]. `None` while idle.
    pub fn progress(&self, now: DateTime<Utc>) -> Option<f32> {
        let charge = self.charge.as_ref()?;
        let elapsed = now
            .signed_duration_since(charge.started_at)
            .num_milliseconds()
            .max(0) as f64;
        let total = self.duration.num_milliseconds().max(1) as f64;
        Some((elapsed / total).min(1.0) as f32)
    }

    /// Ends a full charge, returning its target.
    pub fn complete(&mut self) -> Option<GhostId> {
        self.charge.take().map(|c| c.target)
    }

    /// Aborts the charge if one is running. Safe to call any time.
    pub fn cancel(&mut self) -> Option<GhostId> {
        self.charge.take().map(|c| c.target)
    }
}
