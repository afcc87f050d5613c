//! Player position tracking and zone membership.
//!
//! The tracker owns the latest fix and derives zone membership from
//! it. Transitions are debounced against the tracker's own last-known
//! membership so a crossing reports exactly once, no matter how many
//! steady-state fixes arrive around it.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use geo::Point;
use spook_hunt_field::{RangeReport, Zone};

/// One GPS reading. Superseded whole by each newer reading.
#[derive(Debug, Clone, Copy)]
pub struct PositionFix {
    pub point: Point,
    pub accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ZoneMembership {
    In,
    Out,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTransition {
    Entered,
    Exited,
    /// Membership fell back to unknown after a location failure.
    Lost,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("position request timed out")]
    Timeout,
}

pub type PositionResult = std::result::Result<PositionFix, LocationError>;

/// Continuous watch handle. Fires until dropped; dropping it is the
/// cancellation of the watch.
pub type PositionStream = Pin<Box<dyn Stream<Item = PositionResult> + Send>>;

/// Boundary to the device location service.
pub trait LocationSource: Send + Sync {
    fn current_position<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = PositionResult> + Send + 'a>>;

    fn watch(&self) -> PositionStream;
}

#[derive(Debug)]
pub struct PositionTracker {
    zone: Zone,
    current: Option<PositionFix>,
    membership: ZoneMembership,
}

impl PositionTracker {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            current: None,
            membership: ZoneMembership::Unknown,
        }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn current(&self) -> Option<&PositionFix> {
        self.current.as_ref()
    }

    pub fn membership(&self) -> ZoneMembership {
        self.membership
    }

    /// Distance and bearing to the zone center from the latest fix.
    pub fn range(&self) -> Option<RangeReport> {
        self.current.map(|fix| self.zone.range_report(fix.point))
    }

    /// Applies a fix last-write-wins and reports a membership crossing
    /// when one happened. Steady-state fixes return `None`.
    pub fn apply_fix(&mut self, fix: PositionFix) -> Option<ZoneTransition> {
        let next = if self.zone.contains(fix.point) {
            ZoneMembership::In
        } else {
            ZoneMembership::Out
        };
        self.current = Some(fix);

        let prev = std::mem::replace(&mut self.membership, next);
        if prev == next {
            None
        } else if next == ZoneMembership::In {
            Some(ZoneTransition::Entered)
        } else {
            Some(ZoneTransition::Exited)
        }
    }

    /// Location failure: membership falls to unknown rather than
    /// freezing the previous answer.
    pub fn apply_error(&mut self, err: &LocationError) -> Option<ZoneTransition> {
        tracing::debug!(error = %err, "location error, membership unknown");
        self.current = None;

        let prev = std::mem::replace(&mut self.membership, ZoneMembership::Unknown);
        (prev != ZoneMembership::Unknown).then_some(ZoneTransition::Lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spook_hunt_field::geodesy;

    fn zone() -> Zone {
        Zone::new(Point::new(-48.66775914489331, -27.63979808217616), 100.0).unwrap()
    }

    fn fix_at(distance_m: f64, bearing: f64) -> PositionFix {
        PositionFix {
            point: geodesy::destination(zone().center(), bearing, distance_m),
            accuracy_m: 5.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_starts_unknown() {
        let tracker = PositionTracker::new(zone());
        assert_eq!(tracker.membership(), ZoneMembership::Unknown);
        assert!(tracker.current().is_none());
        assert!(tracker.range().is_none());
    }

    #[test]
    fn test_far_fix_reports_out() {
        let mut tracker = PositionTracker::new(zone());
        let transition = tracker.apply_fix(fix_at(150.0, 90.0));

        assert_eq!(transition, Some(ZoneTransition::Exited));
        assert_eq!(tracker.membership(), ZoneMembership::Out);
    }

    #[test]
    fn test_crossing_reports_exactly_once() {
        let mut tracker = PositionTracker::new(zone());

        assert_eq!(tracker.apply_fix(fix_at(150.0, 0.0)), Some(ZoneTransition::Exited));
        // Approaching but still outside: steady state.
        assert_eq!(tracker.apply_fix(fix_at(120.0, 0.0)), None);
        assert_eq!(tracker.apply_fix(fix_at(50.0, 0.0)), Some(ZoneTransition::Entered));
        // Wandering inside: steady state.
        assert_eq!(tracker.apply_fix(fix_at(80.0, 45.0)), None);
        assert_eq!(tracker.apply_fix(fix_at(101.0, 45.0)), Some(ZoneTransition::Exited));
    }

    #[test]
    fn test_error_drops_to_unknown() {
        let mut tracker = PositionTracker::new(zone());
        tracker.apply_fix(fix_at(50.0, 0.0));

        let transition = tracker.apply_error(&LocationError::PermissionDenied);
        assert_eq!(transition, Some(ZoneTransition::Lost));
        assert_eq!(tracker.membership(), ZoneMembership::Unknown);
        assert!(tracker.current().is_none());

        // Repeated errors are steady state.
        assert_eq!(tracker.apply_error(&LocationError::Timeout), None);
    }

    #[test]
    fn test_recovers_from_unknown() {
        let mut tracker = PositionTracker::new(zone());
        tracker.apply_error(&LocationError::Timeout);

        assert_eq!(tracker.apply_fix(fix_at(10.0, 0.0)), Some(ZoneTransition::Entered));
    }

    #[test]
    fn test_last_write_wins() {
        let mut tracker = PositionTracker::new(zone());
        tracker.apply_fix(fix_at(50.0, 0.0));
        tracker.apply_fix(fix_at(80.0, 180.0));

        let range = tracker.range().unwrap();
        assert!((range.distance_m - 80.0).abs() < 1.0);
    }
}
