//! Geodesy primitives: great-circle distance, forward bearing, and
//! direct point projection on a spherical Earth.
//!
//! Distances use the haversine formula with a mean radius of
//! 6,371,000 m, the value the rest of the game balance was tuned
//! against. Coordinates come straight from device sensors, so no bounds
//! validation is applied here.

use geo::Point;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator),
/// for approximate degree/meter conversions in bounding-box prefilters.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Great-circle distance between two points in meters.
pub fn distance(a: Point, b: Point) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let dphi = (b.y() - a.y()).to_radians();
    let dlambda = (b.x() - a.x()).to_radians();

    let h = (dphi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
pub fn bearing(a: Point, b: Point) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let dlambda = (b.x() - a.x()).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Project the point reached by traveling `distance_m` meters from
/// `origin` along the initial bearing `bearing_deg`.
///
/// Spherical direct geodesic; the output longitude is normalized to
/// [-180, 180).
pub fn destination(origin: Point, bearing_deg: f64, distance_m: f64) -> Point {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.y().to_radians();
    let lambda1 = origin.x().to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    Point::new(normalize_longitude(lambda2.to_degrees()), phi2.to_degrees())
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Convert meters to coordinate degrees at the equator (approximate,
/// for bounding-box prefilters only).
pub fn meters_to_degrees_approx(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}
