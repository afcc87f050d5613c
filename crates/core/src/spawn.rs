//! Ghost spawning.
//!
//! Spawns happen only while the player is in-zone and the population
//! is under its cap: a batch lands immediately on zone entry, then on
//! every respawn tick. Positions are drawn with uniform area density
//! over the spawn disk; candidates closer than the configured minimum
//! spacing to a live ghost are resampled up to a fixed retry budget,
//! after which the last candidate is accepted (crowding beats an
//! unbounded loop on a saturated disk).

use chrono::{DateTime, Duration, Utc};
use geo::Point;
use rand::Rng;
use spook_hunt_field::{SceneProjector, Zone, geodesy};

use crate::config::GhostConfig;
use crate::error::Result;
use crate::ghost::{Ghost, GhostKind};
use crate::ids::GhostId;

const PLACEMENT_TRIES: usize = 8;
const MIN_BATCH: usize = 1;
const MAX_BATCH: usize = 3;

#[derive(Debug)]
pub struct GhostSpawner {
    spawn_disk: Zone,
    min_distance_m: f64,
    max_ghosts: usize,
    lifetime: Duration,
    height_range: (f32, f32),
    strong_chance: f64,
    active: Vec<Ghost>,
}

impl GhostSpawner {
    pub fn new(zone: &Zone, cfg: &GhostConfig) -> Result<Self> {
        // Ghosts never land outside the play zone, whatever the
        // configured spawn radius says.
        let radius = cfg.spawn_radius_m.min(zone.radius_m());
        Ok(Self {
            spawn_disk: Zone::new(zone.center(), radius)?,
            min_distance_m: cfg.min_distance_m,
            max_ghosts: cfg.max_ghosts,
            lifetime: cfg.lifetime(),
            height_range: (cfg.min_height_m, cfg.max_height_m),
            strong_chance: cfg.strong_chance,
            active: Vec::new(),
        })
    }

    pub fn active(&self) -> &[Ghost] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn get(&self, id: &GhostId) -> Option<&Ghost> {
        self.active.iter().find(|g| &g.id == id)
    }

    /// Capture target policy: the oldest active ghost. Captured ghosts
    /// leave the active set at resolution, so whatever is here is fair
    /// game.
    pub fn first_eligible(&self) -> Option<&Ghost> {
        self.active.first()
    }

    /// Spawns up to a small random batch, clamped to the remaining
    /// population headroom. Local offsets are anchored at the player's
    /// position at spawn time.
    pub fn spawn_batch(
        &mut self,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
        player: Point,
    ) -> Vec<Ghost> {
        let headroom = self.max_ghosts.saturating_sub(self.active.len());
        if headroom == 0 {
            return Vec::new();
        }

        let count = rng.random_range(MIN_BATCH..=MAX_BATCH).min(headroom);
        let projector = SceneProjector::new(player);

        let mut spawned = Vec::with_capacity(count);
        for _ in 0..count {
            let geo = self.place(rng);
            let height = rng.random_range(self.height_range.0..=self.height_range.1);
            let kind = if rng.random_bool(self.strong_chance) {
                GhostKind::Strong
            } else {
                GhostKind::Normal
            };

            let ghost = Ghost {
                id: GhostId::generate(rng),
                geo,
                local: projector.offset_at_height(geo, height),
                kind,
                spawned_at: now,
            };
            self.active.push(ghost.clone());
            spawned.push(ghost);
        }

        tracing::debug!(count = spawned.len(), active = self.active.len(), "spawned batch");
        spawned
    }

    /// Removes and returns ghosts past their lifetime.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> Vec<Ghost> {
        let lifetime = self.lifetime;
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|g| now.signed_duration_since(g.spawned_at) >= lifetime);
        self.active = kept;
        expired
    }

    /// Drains the whole active set (zone exit, session stop).
    pub fn clear_all(&mut self) -> Vec<Ghost> {
        std::mem::take(&mut self.active)
    }

    /// Removes one ghost by id, keeping the order of the rest.
    pub fn take(&mut self, id: &GhostId) -> Option<Ghost> {
        let idx = self.active.iter().position(|g| &g.id == id)?;
        Some(self.active.remove(idx))
    }

    fn place(&self, rng: &mut impl Rng) -> Point {
        let mut candidate = self.sample(rng);
        let mut tries = 1;
        while tries < PLACEMENT_TRIES && !self.clear_of_neighbors(candidate) {
            candidate = self.sample(rng);
            tries += 1;
        }
        candidate
    }

    fn sample(&self, rng: &mut impl Rng) -> Point {
        self.spawn_disk.point_on_disk(rng.random(), rng.random())
    }

    fn clear_of_neighbors(&self, candidate: Point) -> bool {
        self.active
            .iter()
            .all(|g| geodesy::distance(candidate, g.geo) >= self.min_distance_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use itertools::Itertools;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn zone() -> Zone {
        Zone::new(Point::new(-48.66775914489331, -27.63979808217616), 100.0).unwrap()
    }

    fn spawner() -> GhostSpawner {
        GhostSpawner::new(&zone(), &GameConfig::default().ghosts).unwrap()
    }

    #[test]
    fn test_batch_size_between_one_and_three() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sp = spawner();

        let spawned = sp.spawn_batch(&mut rng, Utc::now(), zone().center());
        assert!((1..=3).contains(&spawned.len()));
        assert_eq!(sp.len(), spawned.len());
    }

    #[test]
    fn test_population_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut sp = spawner();

        for _ in 0..10 {
            sp.spawn_batch(&mut rng, Utc::now(), zone().center());
            assert!(sp.len() <= 5);
        }
        assert_eq!(sp.len(), 5);

        // Saturated spawner yields nothing.
        assert!(sp.spawn_batch(&mut rng, Utc::now(), zone().center()).is_empty());
    }

    #[test]
    fn test_ghosts_land_inside_zone() {
        let mut rng = StdRng::seed_from_u64(13);
        let z = zone();
        let mut sp = spawner();

        for _ in 0..10 {
            sp.spawn_batch(&mut rng, Utc::now(), z.center());
        }
        for ghost in sp.active() {
            assert!(z.contains(ghost.geo), "ghost escaped the zone");
        }
    }

    #[test]
    fn test_minimum_spacing_holds_with_headroom() {
        // 5 ghosts with 5m spacing inside a 100m disk leaves the retry
        // budget with ample room.
        let mut rng = StdRng::seed_from_u64(14);
        let mut sp = spawner();

        while sp.len() < 5 {
            sp.spawn_batch(&mut rng, Utc::now(), zone().center());
        }
        for pair in sp.active().iter().combinations(2) {
            let d = geodesy::distance(pair[0].geo, pair[1].geo);
            assert!(d >= 5.0, "ghosts {d:.1}m apart");
        }
    }

    #[test]
    fn test_saturated_disk_still_spawns() {
        // A 1m disk cannot honor 10m spacing; the budget runs out and
        // crowded candidates are accepted.
        let mut cfg = GameConfig::default().ghosts;
        cfg.spawn_radius_m = 1.0;
        cfg.min_distance_m = 10.0;
        let mut rng = StdRng::seed_from_u64(15);
        let mut sp = GhostSpawner::new(&zone(), &cfg).unwrap();

        while sp.len() < 5 {
            assert!(!sp.spawn_batch(&mut rng, Utc::now(), zone().center()).is_empty());
        }
    }

    #[test]
    fn test_heights_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut sp = spawner();

        for _ in 0..10 {
            sp.spawn_batch(&mut rng, Utc::now(), zone().center());
        }
        for ghost in sp.active() {
            assert!((1.0..=4.0).contains(&ghost.local.y));
        }
    }

    #[test]
    fn test_evicts_only_expired() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut sp = spawner();
        let start = Utc::now();

        let old = sp.spawn_batch(&mut rng, start, zone().center());
        let fresh_at = start + Duration::seconds(80);
        let fresh = sp.spawn_batch(&mut rng, fresh_at, zone().center());

        // 100s after start: the first batch (100s old) is past the 90s
        // lifetime, the second (20s old) is not.
        let evicted = sp.evict_expired(start + Duration::seconds(100));

        assert_eq!(evicted.len(), old.len());
        assert_eq!(sp.len(), fresh.len());
        for ghost in sp.active() {
            assert_eq!(ghost.spawned_at, fresh_at);
        }
    }

    #[test]
    fn test_clear_all_drains() {
        let mut rng = StdRng::seed_from_u64(18);
        let mut sp = spawner();
        sp.spawn_batch(&mut rng, Utc::now(), zone().center());

        let cleared = sp.clear_all();
        assert!(!cleared.is_empty());
        assert!(sp.is_empty());
        assert!(sp.first_eligible().is_none());
    }

    #[test]
    fn test_take_preserves_order() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut sp = spawner();
        while sp.len() < 3 {
            sp.spawn_batch(&mut rng, Utc::now(), zone().center());
        }

        let ids: Vec<_> = sp.active().iter().map(|g| g.id.clone()).collect();
        let taken = sp.take(&ids[1]).unwrap();
        assert_eq!(taken.id, ids[1]);

        let rest: Vec<_> = sp.active().iter().map(|g| g.id.clone()).collect();
        assert_eq!(rest.len(), ids.len() - 1);
        assert_eq!(rest[0], ids[0]);
        assert_eq!(rest[1], ids[2]);

        // Unknown ids are a miss, not a panic.
        assert!(sp.take(&ids[1]).is_none());
    }

    #[test]
    fn test_first_eligible_is_oldest_active() {
        let mut rng = StdRng::seed_from_u64(20);
        let mut sp = spawner();
        sp.spawn_batch(&mut rng, Utc::now(), zone().center());

        let first = sp.active()[0].id.clone();
        assert_eq!(sp.first_eligible().unwrap().id, first);
    }
}
