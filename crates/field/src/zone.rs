//! Circular play zones.
//!
//! A zone is a geofenced disk on the sphere. Gameplay is only active
//! while the player is inside; outside, the range report feeds the
//! "return to the hunt area" guidance.

use geo::Point;

use crate::error::{FieldError, Result};
use crate::geodesy;

/// Player-facing distance and direction to a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeReport {
    /// Geodesic distance from the query point to the zone center.
    pub distance_m: f64,
    /// Bearing from the query point toward the zone center, degrees
    /// clockwise from north in [0, 360).
    pub bearing_deg: f64,
    pub inside: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    center: Point,
    radius_m: f64,
}

impl Zone {
    pub fn new(center: Point, radius_m: f64) -> Result<Self> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(FieldError::InvalidRadius(radius_m));
        }
        Ok(Self { center, radius_m })
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn distance_to_center(&self, from: Point) -> f64 {
        geodesy::distance(from, self.center)
    }

    /// Bearing from `point` toward the zone center, degrees clockwise
    /// from north.
    pub fn bearing_from(&self, point: Point) -> f64 {
        geodesy::bearing(point, self.center)
    }

    /// Boundary points count as inside.
    pub fn contains(&self, point: Point) -> bool {
        self.distance_to_center(point) <= self.radius_m
    }

    pub fn range_report(&self, from: Point) -> RangeReport {
        let distance_m = self.distance_to_center(from);
        RangeReport {
            distance_m,
            bearing_deg: self.bearing_from(from),
            inside: distance_m <= self.radius_m,
        }
    }

    /// Maps unit-square coordinates onto the zone disk with uniform
    /// area density: radius grows as `sqrt(u)`, angle as `360 * v`.
    /// Callers supply the randomness so placement stays testable.
    pub fn point_on_disk(&self, u: f64, v: f64) -> Point {
        let r = self.radius_m * u.sqrt();
        let theta = 360.0 * v;
        geodesy::destination(self.center, theta, r)
    }
}

/// Formats a distance for HUD display: meters below 1 km, otherwise
/// kilometers with one decimal.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floripa() -> Point {
        Point::new(-48.66775914489331, -27.63979808217616)
    }

    fn zone() -> Zone {
        Zone::new(floripa(), 100.0).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_radius() {
        assert!(Zone::new(floripa(), 0.0).is_err());
        assert!(Zone::new(floripa(), -5.0).is_err());
        assert!(Zone::new(floripa(), f64::NAN).is_err());
        assert!(Zone::new(floripa(), f64::INFINITY).is_err());
    }

    #[test]
    fn test_contains_center_and_interior() {
        let z = zone();
        assert!(z.contains(floripa()));

        let near = geodesy::destination(floripa(), 45.0, 80.0);
        assert!(z.contains(near));
    }

    #[test]
    fn test_excludes_exterior_points() {
        let z = zone();
        let out = geodesy::destination(floripa(), 200.0, 150.0);
        assert!(!z.contains(out));
    }

    #[test]
    fn test_bearing_from_aims_at_the_center() {
        let z = zone();
        // Due north of the center, so the way back is due south.
        let north = geodesy::destination(floripa(), 0.0, 150.0);
        assert_relative_eq!(z.bearing_from(north), 180.0, epsilon = 0.5);
    }

    #[test]
    fn test_range_report_points_back_at_center() {
        let z = zone();
        let out = geodesy::destination(floripa(), 90.0, 250.0);

        let report = z.range_report(out);
        assert!(!report.inside);
        assert_relative_eq!(report.distance_m, 250.0, max_relative = 1e-3);
        // Center lies due west of a point placed due east of it.
        assert_relative_eq!(report.bearing_deg, 270.0, epsilon = 0.5);
    }

    #[test]
    fn test_range_report_inside_keeps_distance() {
        let z = zone();
        let inner = geodesy::destination(floripa(), 10.0, 40.0);

        let report = z.range_report(inner);
        assert!(report.inside);
        assert_relative_eq!(report.distance_m, 40.0, max_relative = 1e-3);
    }

    #[test]
    fn test_disk_points_stay_inside_zone() {
        let z = zone();
        for u in [0.0, 0.1, 0.5, 0.9, 1.0] {
            for v in [0.0, 0.25, 0.5, 0.75, 0.99] {
                let p = z.point_on_disk(u, v);
                assert!(
                    z.distance_to_center(p) <= z.radius_m() + 0.01,
                    "u={u} v={v} escaped the disk"
                );
            }
        }
    }

    #[test]
    fn test_disk_sampling_is_area_uniform() {
        // Half the unit interval in u covers half the disk area, so
        // the radius at u = 0.5 must be radius / sqrt(2).
        let z = zone();
        let p = z.point_on_disk(0.5, 0.0);
        assert_relative_eq!(
            z.distance_to_center(p),
            100.0 / 2.0_f64.sqrt(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn test_formats_distances_for_hud() {
        assert_eq!(format_distance(87.4), "87m");
        assert_eq!(format_distance(999.4), "999m");
        assert_eq!(format_distance(1000.0), "1.0km");
        assert_eq!(format_distance(1234.0), "1.2km");
        assert_eq!(format_distance(0.2), "0m");
    }
}
