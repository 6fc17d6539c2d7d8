//! Motif model and candidate generation
//!
//! A motif is a pair of relative neighbor offsets. Applying it to every
//! satellite gives each one (up to) two outgoing links, which together with
//! the links other satellites point back at it fills the 4-link budget.
//!
//! Candidates are enumerated from the candidate ISLs of one seed satellite
//! in orbit 0:
//!
//! 1. keep links to a higher id whose endpoint sits in the first quarter of
//!    the orbits (orbit index < orbits / 4)
//! 2. express the endpoint as `(orbit offset, in-orbit offset)` with the
//!    in-orbit offset wrapped by one orbit length once it passes a quarter
//!    orbit, and drop same-orbit offsets that point backwards
//! 3. pair the offsets up, skipping pairs that are both same-orbit or that
//!    name the same target satellite
//!
//! The quarter-orbit wrap and the backwards same-orbit rule are symmetry
//! breaking assumptions tuned for Walker-delta shells; they are not proven
//! for arbitrary grids.

use constellation_store::{ConstellationConfig, ConstellationStore, Satellite};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How far below a zone's lower bound a seed satellite may sit (degrees)
pub const SEED_LATITUDE_BUFFER_DEG: f64 = 2.0;

/// Neighbor position relative to a satellite's own orbit / slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeOffset {
    pub orbit: i32,
    pub in_orbit: i32,
}

impl RelativeOffset {
    pub fn new(orbit: i32, in_orbit: i32) -> Self {
        Self { orbit, in_orbit }
    }

    /// Grid cell reached from `sat`, wrapped around both orbit dimensions
    pub fn apply(&self, sat: &Satellite, constellation: &ConstellationConfig) -> (u32, u32) {
        let orbit = (sat.orbit as i64 + self.orbit as i64).rem_euclid(constellation.orbits as i64);
        let slot = (sat.in_orbit as i64 + self.in_orbit as i64)
            .rem_euclid(constellation.satellites_per_orbit as i64);
        (orbit as u32, slot as u32)
    }
}

/// Population-weighted score of one materialised topology
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotifScore {
    /// Weighted average stretch
    pub stretch: f64,
    /// Weighted average hop count
    pub hop_count: f64,
    /// `stretch + hop_count`, lower is better
    pub metric: f64,
}

impl MotifScore {
    /// Score of a topology that left at least one city pair disconnected
    pub const SENTINEL: f64 = 99999.0;

    pub fn new(stretch: f64, hop_count: f64) -> Self {
        Self {
            stretch,
            hop_count,
            metric: stretch + hop_count,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            stretch: Self::SENTINEL,
            hop_count: Self::SENTINEL,
            metric: Self::SENTINEL,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.metric >= Self::SENTINEL
    }
}

/// Candidate connection rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motif {
    /// Position in the candidate list it was generated into
    pub index: usize,
    pub offsets: [RelativeOffset; 2],
    /// Seed-relative target satellites the offsets were derived from
    pub targets: Option<[u32; 2]>,
    /// Set once the motif has been evaluated
    pub score: Option<MotifScore>,
}

impl Motif {
    /// Motif given directly by offsets, e.g. a configured baseline
    pub fn from_offsets(index: usize, offsets: [(i32, i32); 2]) -> Self {
        Self {
            index,
            offsets: offsets.map(|(o, s)| RelativeOffset::new(o, s)),
            targets: None,
            score: None,
        }
    }

    pub fn metric(&self) -> Option<f64> {
        self.score.map(|s| s.metric)
    }
}

/// One usable link direction of a seed satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOffset {
    pub target: u32,
    pub offset: RelativeOffset,
}

pub struct MotifGenerator<'a> {
    store: &'a ConstellationStore,
}

impl<'a> MotifGenerator<'a> {
    pub fn new(store: &'a ConstellationStore) -> Self {
        Self { store }
    }

    /// Seed-relative offsets of the seed's usable candidate links, in link order
    pub fn link_offsets(&self, seed: u32) -> Vec<LinkOffset> {
        let constellation = self.store.constellation();
        let per_orbit = constellation.satellites_per_orbit as i64;
        let orbit_quarter = constellation.orbits as f64 / 4.0;
        let slot_quarter = per_orbit as f64 / 4.0;

        let mut offsets: Vec<LinkOffset> = Vec::new();
        for link in self.store.candidate_links() {
            let Some(target) = link.other(seed) else {
                continue;
            };
            if target <= seed || self.store.satellite(target).orbit as f64 >= orbit_quarter {
                continue;
            }
            if offsets.iter().any(|o| o.target == target) {
                continue;
            }

            let orbit = target as i64 / per_orbit;
            let mut in_orbit = target as i64 - seed as i64 - orbit * per_orbit;
            if in_orbit as f64 > slot_quarter {
                in_orbit -= per_orbit;
            }
            if orbit == 0 && in_orbit < 0 {
                continue;
            }

            offsets.push(LinkOffset {
                target,
                offset: RelativeOffset::new(orbit as i32, in_orbit as i32),
            });
        }
        offsets
    }

    /// All candidate motifs for one seed, indexed from 0
    pub fn motifs_for_seed(&self, seed: u32) -> Vec<Motif> {
        let links = self.link_offsets(seed);
        let mut motifs = Vec::new();
        for (i, a) in links.iter().enumerate() {
            for b in &links[i + 1..] {
                let both_same_orbit = a.offset.orbit == 0 && b.offset.orbit == 0;
                if both_same_orbit || a.target == b.target {
                    continue;
                }
                motifs.push(Motif {
                    index: motifs.len(),
                    offsets: [a.offset, b.offset],
                    targets: Some([a.target, b.target]),
                    score: None,
                });
            }
        }
        debug!("Seed {} yields {} link offsets, {} motifs", seed, links.len(), motifs.len());
        motifs
    }

    /// Orbit-0 satellites in the first quarter of the orbit, by id
    pub fn first_quadrant_seeds(&self) -> Vec<u32> {
        let slot_quarter = self.store.constellation().satellites_per_orbit as f64 / 4.0;
        self.store
            .satellites()
            .iter()
            .filter(|s| s.orbit == 0 && (s.in_orbit as f64) < slot_quarter)
            .map(|s| s.id)
            .collect()
    }

    /// Seed for a latitude zone: among first-quadrant seeds whose latitude
    /// lies strictly within `(lower - 2°, upper)`, the one with the fewest
    /// candidate motifs (first by id on ties).
    pub fn seed_for_zone(&self, lower: f64, upper: f64) -> Option<u32> {
        let buffered = lower - SEED_LATITUDE_BUFFER_DEG;
        let mut best: Option<(u32, usize)> = None;
        for seed in self.first_quadrant_seeds() {
            let lat = self.store.satellite(seed).lat_deg;
            if !(buffered < lat && lat < upper) {
                continue;
            }
            let count = self.motifs_for_seed(seed).len();
            if best.map_or(true, |(_, min)| count < min) {
                best = Some((seed, count));
            }
        }
        best.map(|(seed, _)| seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constellation_store::{CandidateLink, City, CityPair, WalkerDelta};

    fn store_with_links(config: ConstellationConfig, sats: Vec<Satellite>, links: Vec<CandidateLink>) -> ConstellationStore {
        let cities = vec![City { id: 0, name: "X".into(), lat_deg: 0.0, lon_deg: 0.0, population: 1.0 }];
        let pairs = vec![CityPair { city_1: 0, city_2: 0, geodesic_km: 1.0 }];
        ConstellationStore::new(config, sats, links, cities, Vec::new(), pairs).unwrap()
    }

    fn link(a: u32, b: u32) -> CandidateLink {
        CandidateLink { sat_1: a, sat_2: b, length_km: 1000.0 }
    }

    fn walker_store(max_km: f64) -> ConstellationStore {
        let walker = WalkerDelta::new(8, 8, 1, 550.0, 53.0);
        let sats = walker.satellites();
        let links = constellation_store::geometry::candidate_links(&sats, max_km);
        store_with_links(walker.config("walker-8x8"), sats, links)
    }

    #[test]
    fn test_offsets_relative_to_seed() {
        // 8 orbits x 8 slots; orbit quarter = 2, slot quarter = 2
        let walker = WalkerDelta::new(8, 8, 0, 550.0, 53.0);
        let links = vec![
            link(0, 1),  // same orbit, +1
            link(0, 7),  // same orbit, wraps to -1 -> dropped
            link(0, 8),  // orbit 1, slot 0
            link(0, 15), // orbit 1, slot 7 -> -1
            link(0, 16), // orbit 2 -> outside first quarter
        ];
        let store = store_with_links(walker.config("t"), walker.satellites(), links);
        let offsets = MotifGenerator::new(&store).link_offsets(0);

        let got: Vec<(u32, i32, i32)> = offsets
            .iter()
            .map(|o| (o.target, o.offset.orbit, o.offset.in_orbit))
            .collect();
        assert_eq!(got, vec![(1, 0, 1), (8, 1, 0), (15, 1, -1)]);
    }

    #[test]
    fn test_reverse_link_records_deduplicated() {
        let walker = WalkerDelta::new(8, 8, 0, 550.0, 53.0);
        let links = vec![link(0, 8), link(8, 0), link(0, 1)];
        let store = store_with_links(walker.config("t"), walker.satellites(), links);
        let offsets = MotifGenerator::new(&store).link_offsets(0);
        assert_eq!(offsets.len(), 2);
    }

    #[test]
    fn test_motif_pairs_exclude_same_orbit_pairs() {
        let walker = WalkerDelta::new(8, 8, 0, 550.0, 53.0);
        let links = vec![link(0, 1), link(0, 2), link(0, 8), link(0, 9)];
        let store = store_with_links(walker.config("t"), walker.satellites(), links);
        let motifs = MotifGenerator::new(&store).motifs_for_seed(0);

        // 4 offsets -> 6 pairs, minus (1,2) same-orbit = 5
        assert_eq!(motifs.len(), 5);
        for (i, m) in motifs.iter().enumerate() {
            assert_eq!(m.index, i);
            assert!(!(m.offsets[0].orbit == 0 && m.offsets[1].orbit == 0));
            let [a, b] = m.targets.unwrap();
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_generated_motifs_respect_invariants_on_walker_shell() {
        let store = walker_store(7000.0);
        let generator = MotifGenerator::new(&store);
        for seed in generator.first_quadrant_seeds() {
            for m in generator.motifs_for_seed(seed) {
                let [a, b] = m.targets.unwrap();
                assert_ne!(a, b);
                assert!(m.offsets[0].orbit != 0 || m.offsets[1].orbit != 0);
            }
        }
    }

    #[test]
    fn test_first_quadrant_seeds() {
        let store = walker_store(7000.0);
        assert_eq!(MotifGenerator::new(&store).first_quadrant_seeds(), vec![0, 1]);
    }

    #[test]
    fn test_seed_for_zone_filters_by_latitude() {
        let store = walker_store(7000.0);
        let generator = MotifGenerator::new(&store);
        // Seed 0 sits on the equator, seed 1 at ~34° N
        assert_eq!(generator.seed_for_zone(0.0, 18.0), Some(0));
        assert_eq!(generator.seed_for_zone(18.0, 36.0), Some(1));
        assert_eq!(generator.seed_for_zone(60.0, 90.0), None);
    }

    /// 8x8 grid with every satellite at the same latitude
    fn flat_store(links: Vec<CandidateLink>) -> ConstellationStore {
        let sats = (0..64)
            .map(|id| Satellite::new(id, id / 8, id % 8, 10.0, 0.0, 550.0))
            .collect();
        store_with_links(ConstellationConfig::new("flat", 8, 8), sats, links)
    }

    #[test]
    fn test_seed_for_zone_prefers_fewest_motifs() {
        // Seed 0: (0,1), (1,0), (1,1) -> 3 motifs; seed 1: (1,0), (1,1) -> 1 motif
        let store = flat_store(vec![link(0, 1), link(0, 8), link(0, 9), link(1, 9), link(1, 10)]);
        let generator = MotifGenerator::new(&store);
        assert_eq!(generator.first_quadrant_seeds(), vec![0, 1]);
        assert_eq!(generator.motifs_for_seed(0).len(), 3);
        assert_eq!(generator.motifs_for_seed(1).len(), 1);
        assert_eq!(generator.seed_for_zone(0.0, 18.0), Some(1));
    }

    #[test]
    fn test_seed_for_zone_tie_goes_to_lowest_id() {
        // Both seeds have offsets (0,1), (1,0), (1,1) -> 3 motifs each
        let store = flat_store(vec![
            link(0, 1),
            link(0, 8),
            link(0, 9),
            link(1, 2),
            link(1, 9),
            link(1, 10),
        ]);
        let generator = MotifGenerator::new(&store);
        assert_eq!(generator.motifs_for_seed(0).len(), 3);
        assert_eq!(generator.motifs_for_seed(1).len(), 3);
        assert_eq!(generator.seed_for_zone(0.0, 18.0), Some(0));
    }

    #[test]
    fn test_offset_apply_wraps() {
        let config = ConstellationConfig::new("t", 4, 6);
        let sat = Satellite::new(23, 3, 5, 0.0, 0.0, 550.0);
        assert_eq!(RelativeOffset::new(1, 1).apply(&sat, &config), (0, 0));
        assert_eq!(RelativeOffset::new(0, -6).apply(&sat, &config), (3, 5));
        let first = Satellite::new(0, 0, 0, 0.0, 0.0, 550.0);
        assert_eq!(RelativeOffset::new(0, -1).apply(&first, &config), (0, 5));
    }

    #[test]
    fn test_sentinel_score() {
        let s = MotifScore::unreachable();
        assert!(s.is_unreachable());
        assert_eq!(s.metric, 99999.0);
        assert!(!MotifScore::new(1.3, 4.0).is_unreachable());
        assert_eq!(MotifScore::new(1.5, 4.0).metric, 5.5);
    }

    #[test]
    fn test_motif_from_offsets() {
        let m = Motif::from_offsets(0, [(0, 1), (1, 0)]);
        assert_eq!(m.offsets[1], RelativeOffset::new(1, 0));
        assert!(m.targets.is_none());
        assert!(m.metric().is_none());
    }
}
