//! Constellation Store
//!
//! Read-only inputs for the ISL motif search:
//!
//! - Satellite positions on the orbit / in-orbit grid
//! - Candidate ISLs, pre-filtered by maximum physical length
//! - Cities with population and their feasible uplinks (coverage)
//! - City pairs with geodesic reference distances
//!
//! Records are loaded once into a [`ConstellationStore`], which resolves
//! every id reference to an index at construction time. After that the
//! store is shared by reference across all search workers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

pub mod geometry;
pub mod loader;
pub mod walker;

pub use loader::{BaselineConfig, DataLayout};
pub use walker::{ConstellationConfig, WalkerDelta};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        path: PathBuf,
        line: usize,
        expected: String,
        found: usize,
    },
    #[error("{path:?} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("Unable to identify configuration: {0}")]
    UnknownConstellation(String),
    #[error("Unknown satellite id {0}")]
    UnknownSatellite(u32),
    #[error("Unknown city id {0}")]
    UnknownCity(u32),
    #[error("Satellite ids must be dense 0..{expected}, found {found}")]
    SatelliteIdGap { expected: usize, found: u32 },
    #[error("Satellite {id} (orbit {orbit}, slot {in_orbit}) is outside the {orbits}x{per_orbit} grid")]
    OutsideGrid {
        id: u32,
        orbit: u32,
        in_orbit: u32,
        orbits: u32,
        per_orbit: u32,
    },
    #[error("City pair {city_1}-{city_2} has geodesic distance {geodesic_km}, expected a positive finite value")]
    InvalidGeodesic {
        city_1: u32,
        city_2: u32,
        geodesic_km: f64,
    },
    #[error("Satellites {0} and {1} occupy the same orbit slot")]
    DuplicateSlot(u32, u32),
    #[error("No {0} records loaded")]
    Empty(&'static str),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A satellite position at the snapshot epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    pub id: u32,
    /// Orbit (plane) index
    pub orbit: u32,
    /// Position within the orbit
    pub in_orbit: u32,
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub alt_km: f64,
}

impl Satellite {
    pub fn new(id: u32, orbit: u32, in_orbit: u32, lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            id,
            orbit,
            in_orbit,
            lat_deg,
            lon_deg,
            lat_rad: lat_deg.to_radians(),
            lon_rad: lon_deg.to_radians(),
            alt_km,
        }
    }

    pub fn abs_lat(&self) -> f64 {
        self.lat_deg.abs()
    }
}

/// Unordered satellite pair within the maximum allowed ISL length
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CandidateLink {
    pub sat_1: u32,
    pub sat_2: u32,
    pub length_km: f64,
}

impl CandidateLink {
    /// The endpoint opposite `sat`, if the link touches it
    pub fn other(&self, sat: u32) -> Option<u32> {
        if self.sat_1 == sat {
            Some(self.sat_2)
        } else if self.sat_2 == sat {
            Some(self.sat_1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: u32,
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub population: f64,
}

/// Feasible city → satellite up/down-link
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CityCoverage {
    pub city: u32,
    pub satellite: u32,
    pub distance_km: f64,
}

/// City pair as it appears in the pair file (city ids)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CityPair {
    pub city_1: u32,
    pub city_2: u32,
    pub geodesic_km: f64,
}

/// Uplink from a city to one satellite
#[derive(Debug, Clone, Copy)]
pub struct Uplink {
    pub satellite: u32,
    pub distance_km: f64,
}

/// City pair with both cities resolved to indices into [`ConstellationStore::cities`]
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPair {
    pub city_1: usize,
    pub city_2: usize,
    pub geodesic_km: f64,
}

/// All search inputs, validated and index-addressed
#[derive(Debug, Clone)]
pub struct ConstellationStore {
    constellation: ConstellationConfig,
    satellites: Vec<Satellite>,
    /// `orbit * satellites_per_orbit + in_orbit` → satellite id
    grid: Vec<Option<u32>>,
    links: Vec<CandidateLink>,
    cities: Vec<City>,
    uplinks: Vec<Vec<Uplink>>,
    pairs: Vec<ResolvedPair>,
}

impl ConstellationStore {
    /// Build a store, resolving every id reference.
    ///
    /// Satellite ids must be dense (`0..N`) and each satellite must sit in
    /// its own cell of the constellation grid. Link, coverage and pair
    /// records that name an unknown satellite or city are rejected, as are
    /// pairs whose geodesic distance is not a positive finite number.
    pub fn new(
        constellation: ConstellationConfig,
        mut satellites: Vec<Satellite>,
        links: Vec<CandidateLink>,
        cities: Vec<City>,
        coverage: Vec<CityCoverage>,
        city_pairs: Vec<CityPair>,
    ) -> Result<Self> {
        if satellites.is_empty() {
            return Err(StoreError::Empty("satellite"));
        }
        if city_pairs.is_empty() {
            return Err(StoreError::Empty("city pair"));
        }

        satellites.sort_by_key(|s| s.id);
        for (expected, sat) in satellites.iter().enumerate() {
            if sat.id as usize != expected {
                return Err(StoreError::SatelliteIdGap {
                    expected: satellites.len(),
                    found: sat.id,
                });
            }
        }

        let orbits = constellation.orbits;
        let per_orbit = constellation.satellites_per_orbit;
        let mut grid = vec![None; orbits as usize * per_orbit as usize];
        for sat in &satellites {
            if sat.orbit >= orbits || sat.in_orbit >= per_orbit {
                return Err(StoreError::OutsideGrid {
                    id: sat.id,
                    orbit: sat.orbit,
                    in_orbit: sat.in_orbit,
                    orbits,
                    per_orbit,
                });
            }
            let cell = &mut grid[(sat.orbit * per_orbit + sat.in_orbit) as usize];
            if let Some(existing) = *cell {
                return Err(StoreError::DuplicateSlot(existing, sat.id));
            }
            *cell = Some(sat.id);
        }

        let sat_count = satellites.len() as u32;
        for link in &links {
            for sat in [link.sat_1, link.sat_2] {
                if sat >= sat_count {
                    return Err(StoreError::UnknownSatellite(sat));
                }
            }
        }

        let city_index: HashMap<u32, usize> =
            cities.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let resolve = |id: u32| city_index.get(&id).copied().ok_or(StoreError::UnknownCity(id));

        let mut uplinks = vec![Vec::new(); cities.len()];
        for cov in &coverage {
            if cov.satellite >= sat_count {
                return Err(StoreError::UnknownSatellite(cov.satellite));
            }
            uplinks[resolve(cov.city)?].push(Uplink {
                satellite: cov.satellite,
                distance_km: cov.distance_km,
            });
        }

        let pairs = city_pairs
            .iter()
            .map(|p| {
                if !(p.geodesic_km.is_finite() && p.geodesic_km > 0.0) {
                    return Err(StoreError::InvalidGeodesic {
                        city_1: p.city_1,
                        city_2: p.city_2,
                        geodesic_km: p.geodesic_km,
                    });
                }
                Ok(ResolvedPair {
                    city_1: resolve(p.city_1)?,
                    city_2: resolve(p.city_2)?,
                    geodesic_km: p.geodesic_km,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Store ready: {} satellites ({}x{}), {} candidate ISLs, {} cities, {} uplinks, {} city pairs",
            satellites.len(),
            orbits,
            per_orbit,
            links.len(),
            cities.len(),
            coverage.len(),
            pairs.len()
        );

        Ok(Self {
            constellation,
            satellites,
            grid,
            links,
            cities,
            uplinks,
            pairs,
        })
    }

    pub fn constellation(&self) -> &ConstellationConfig {
        &self.constellation
    }

    pub fn satellites(&self) -> &[Satellite] {
        &self.satellites
    }

    /// Satellite by id. Ids are dense, so this is a plain index.
    pub fn satellite(&self, id: u32) -> &Satellite {
        &self.satellites[id as usize]
    }

    /// Satellite occupying an exact grid cell
    pub fn satellite_at(&self, orbit: u32, in_orbit: u32) -> Option<u32> {
        let per_orbit = self.constellation.satellites_per_orbit;
        if orbit >= self.constellation.orbits || in_orbit >= per_orbit {
            return None;
        }
        self.grid[(orbit * per_orbit + in_orbit) as usize]
    }

    pub fn candidate_links(&self) -> &[CandidateLink] {
        &self.links
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city(&self, index: usize) -> &City {
        &self.cities[index]
    }

    /// Feasible uplinks for the city at `index`
    pub fn uplinks(&self, index: usize) -> &[Uplink] {
        &self.uplinks[index]
    }

    pub fn pairs(&self) -> &[ResolvedPair] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x2() -> Vec<Satellite> {
        vec![
            Satellite::new(0, 0, 0, 10.0, 0.0, 550.0),
            Satellite::new(1, 0, 1, -10.0, 180.0, 550.0),
            Satellite::new(2, 1, 0, 10.0, 90.0, 550.0),
            Satellite::new(3, 1, 1, -10.0, -90.0, 550.0),
        ]
    }

    fn cities() -> Vec<City> {
        vec![
            City { id: 100, name: "A".into(), lat_deg: 10.0, lon_deg: 0.0, population: 1000.0 },
            City { id: 200, name: "B".into(), lat_deg: 10.0, lon_deg: 90.0, population: 500.0 },
        ]
    }

    fn pairs() -> Vec<CityPair> {
        vec![CityPair { city_1: 100, city_2: 200, geodesic_km: 9800.0 }]
    }

    #[test]
    fn test_store_resolves_references() {
        let coverage = vec![
            CityCoverage { city: 100, satellite: 0, distance_km: 600.0 },
            CityCoverage { city: 200, satellite: 2, distance_km: 610.0 },
            CityCoverage { city: 200, satellite: 3, distance_km: 2500.0 },
        ];
        let store = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            grid_2x2(),
            Vec::new(),
            cities(),
            coverage,
            pairs(),
        )
        .unwrap();

        assert_eq!(store.pairs()[0].city_1, 0);
        assert_eq!(store.pairs()[0].city_2, 1);
        assert_eq!(store.uplinks(1).len(), 2);
        assert_eq!(store.satellite_at(1, 1), Some(3));
        assert_eq!(store.satellite_at(2, 0), None);
    }

    #[test]
    fn test_unsorted_satellites_are_reindexed() {
        let mut sats = grid_2x2();
        sats.reverse();
        let store = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            sats,
            Vec::new(),
            cities(),
            Vec::new(),
            pairs(),
        )
        .unwrap();
        assert_eq!(store.satellite(2).orbit, 1);
    }

    #[test]
    fn test_dangling_city_rejected() {
        let bad_pairs = vec![CityPair { city_1: 100, city_2: 999, geodesic_km: 1.0 }];
        let err = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            grid_2x2(),
            Vec::new(),
            cities(),
            Vec::new(),
            bad_pairs,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::UnknownCity(999)));
    }

    #[test]
    fn test_dangling_link_rejected() {
        let links = vec![CandidateLink { sat_1: 0, sat_2: 7, length_km: 100.0 }];
        let err = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            grid_2x2(),
            links,
            cities(),
            Vec::new(),
            pairs(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::UnknownSatellite(7)));
    }

    #[test]
    fn test_id_gap_rejected() {
        let mut sats = grid_2x2();
        sats[3].id = 5;
        let err = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            sats,
            Vec::new(),
            cities(),
            Vec::new(),
            pairs(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::SatelliteIdGap { found: 5, .. }));
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut sats = grid_2x2();
        sats[3].in_orbit = 0;
        let err = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            sats,
            Vec::new(),
            cities(),
            Vec::new(),
            pairs(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlot(2, 3)));
    }

    #[test]
    fn test_empty_pairs_rejected() {
        let err = ConstellationStore::new(
            ConstellationConfig::new("test", 2, 2),
            grid_2x2(),
            Vec::new(),
            cities(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Empty("city pair")));
    }

    #[test]
    fn test_degenerate_geodesic_rejected() {
        for geodesic_km in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let bad_pairs = vec![CityPair { city_1: 100, city_2: 200, geodesic_km }];
            let err = ConstellationStore::new(
                ConstellationConfig::new("test", 2, 2),
                grid_2x2(),
                Vec::new(),
                cities(),
                Vec::new(),
                bad_pairs,
            )
            .unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidGeodesic { city_1: 100, city_2: 200, .. }),
                "{geodesic_km} accepted"
            );
        }
    }

    #[test]
    fn test_candidate_link_other() {
        let link = CandidateLink { sat_1: 3, sat_2: 9, length_km: 1.0 };
        assert_eq!(link.other(3), Some(9));
        assert_eq!(link.other(9), Some(3));
        assert_eq!(link.other(4), None);
    }
}
