//! Checkpoint registry and token validation.
//!
//! Checkpoints are fixed physical stations (deposit units) identified
//! by an opaque token printed at the station. The registry answers
//! exact token lookups and proximity queries; the latter run a cheap
//! rectangular prefilter in degree space through an R-tree, then
//! refine with geodesic distance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{FieldError, Result};
use crate::geodesy;

/// Opaque station identifier, compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointToken(Arc<str>);

impl CheckpointToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckpointToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckpointToken {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for CheckpointToken {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub token: CheckpointToken,
    pub name: Arc<str>,
    pub location: Point,
}

impl Checkpoint {
    pub fn new(token: impl Into<CheckpointToken>, name: &str, location: Point) -> Self {
        Self {
            token: token.into(),
            name: Arc::from(name),
            location,
        }
    }
}

/// Tree node, kept separate from [`Checkpoint`] so the registry's
/// HashMap stays the single source of truth.
#[derive(Debug, Clone)]
struct CheckpointNode {
    token: CheckpointToken,
    coords: [f64; 2],
}

impl RTreeObject for CheckpointNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for CheckpointNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Debug)]
pub struct CheckpointRegistry {
    by_token: HashMap<CheckpointToken, Checkpoint>,
    tree: RTree<CheckpointNode>,
}

impl CheckpointRegistry {
    pub fn from_checkpoints(checkpoints: Vec<Checkpoint>) -> Result<Self> {
        let mut by_token = HashMap::with_capacity(checkpoints.len());
        let mut nodes = Vec::with_capacity(checkpoints.len());

        for cp in checkpoints {
            let token = cp.token.clone();
            nodes.push(CheckpointNode {
                token: token.clone(),
                coords: [cp.location.x(), cp.location.y()],
            });
            if by_token.insert(token.clone(), cp).is_some() {
                return Err(FieldError::DuplicateToken(token));
            }
        }

        Ok(Self {
            by_token,
            tree: RTree::bulk_load(nodes),
        })
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    pub fn get(&self, token: &CheckpointToken) -> Option<&Checkpoint> {
        self.by_token.get(token)
    }

    /// Exact-match token validation. Scanned strings pass through
    /// untrimmed; station tokens never carry whitespace.
    pub fn validate(&self, scanned: &str) -> Option<&Checkpoint> {
        self.by_token.get(&CheckpointToken::from(scanned))
    }

    /// Closest checkpoint to `from` with its geodesic distance.
    pub fn nearest(&self, from: Point) -> Option<(&Checkpoint, f64)> {
        let node = self.tree.nearest_neighbor(&[from.x(), from.y()])?;
        let cp = self.by_token.get(&node.token)?;
        Some((cp, geodesy::distance(from, cp.location)))
    }

    /// Checkpoints within `radius_m` of `from`, nearest first.
    ///
    /// The prefilter radius is converted to degrees at the query
    /// latitude with a 5% inflation so the rectangular pass never
    /// drops a true hit; geodesic refinement then trims the rest.
    pub fn within(&self, from: Point, radius_m: f64) -> Vec<(&Checkpoint, f64)> {
        let cos_lat = from.y().to_radians().cos().abs().max(0.01);
        let r_deg = geodesy::meters_to_degrees_approx(radius_m) * 1.05 / cos_lat;

        let mut hits: Vec<(&Checkpoint, f64)> = self
            .tree
            .locate_within_distance([from.x(), from.y()], r_deg * r_deg)
            .filter_map(|node| self.by_token.get(&node.token))
            .map(|cp| (cp, geodesy::distance(from, cp.location)))
            .filter(|(_, d)| *d <= radius_m)
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floripa() -> Point {
        Point::new(-48.66775914489331, -27.63979808217616)
    }

    fn registry() -> CheckpointRegistry {
        CheckpointRegistry::from_checkpoints(vec![
            Checkpoint::new(
                "CONTAINMENT_UNIT_FLORIPA_001",
                "Containment Unit",
                floripa(),
            ),
            Checkpoint::new(
                "CONTAINMENT_UNIT_FLORIPA_002",
                "Annex Station",
                geodesy::destination(floripa(), 60.0, 450.0),
            ),
            Checkpoint::new(
                "CONTAINMENT_UNIT_NORTH_001",
                "North Station",
                geodesy::destination(floripa(), 0.0, 2_500.0),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_tokens() {
        let result = CheckpointRegistry::from_checkpoints(vec![
            Checkpoint::new("T1", "A", floripa()),
            Checkpoint::new("T1", "B", geodesy::destination(floripa(), 90.0, 10.0)),
        ]);
        assert!(matches!(result, Err(FieldError::DuplicateToken(_))));
    }

    #[test]
    fn test_validates_exact_tokens_only() {
        let reg = registry();
        assert!(reg.validate("CONTAINMENT_UNIT_FLORIPA_001").is_some());
        assert!(reg.validate("containment_unit_floripa_001").is_none());
        assert!(reg.validate("CONTAINMENT_UNIT_FLORIPA_001 ").is_none());
        assert!(reg.validate("").is_none());
    }

    #[test]
    fn test_nearest_picks_the_closest_station() {
        let reg = registry();
        let from = geodesy::destination(floripa(), 60.0, 430.0);

        let (cp, dist) = reg.nearest(from).unwrap();
        assert_eq!(cp.token.as_str(), "CONTAINMENT_UNIT_FLORIPA_002");
        assert_relative_eq!(dist, 20.0, max_relative = 0.05);
    }

    #[test]
    fn test_within_filters_and_sorts_by_distance() {
        let reg = registry();
        let from = geodesy::destination(floripa(), 60.0, 100.0);

        let hits = reg.within(from, 600.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.token.as_str(), "CONTAINMENT_UNIT_FLORIPA_001");
        assert_eq!(hits[1].0.token.as_str(), "CONTAINMENT_UNIT_FLORIPA_002");
        assert!(hits[0].1 < hits[1].1);
    }

    #[test]
    fn test_within_excludes_far_stations() {
        let reg = registry();
        let hits = reg.within(floripa(), 600.0);
        assert!(hits
            .iter()
            .all(|(cp, _)| cp.token.as_str() != "CONTAINMENT_UNIT_NORTH_001"));
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let reg = CheckpointRegistry::from_checkpoints(vec![]).unwrap();
        assert!(reg.is_empty());
        assert!(reg.nearest(floripa()).is_none());
        assert!(reg.within(floripa(), 1_000.0).is_empty());
    }
}
