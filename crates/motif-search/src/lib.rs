//! ISL Motif Search
//!
//! Finds the repeating two-link connection rule ("motif") that gives a
//! constellation the lowest population-weighted latency, either once for
//! the whole shell or zone by zone across latitude bands.
//!
//! # Pipeline
//!
//! ```text
//! store ──► motif generator ──► parallel driver ──► winner ──► zone assembler
//!                                 (batches of N)                   │
//!                                                                  ▼
//!                                   baseline motif ──► improvement over baseline
//! ```
//!
//! Candidate motifs are evaluated in batches of at most `workers`, each on
//! its own copy of the base topology. Results are re-indexed by motif
//! position before the winner is picked, so the outcome does not depend on
//! the worker count or on completion order.

use constellation_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

pub mod driver;
pub mod report;
pub mod zones;

pub use driver::{select_best, MotifResult, SearchDriver};
pub use report::{ReportWriter, RunSummary};
pub use zones::{
    Assembly, BaselineRun, LatitudeZone, SingleRun, ZoneAssembler, ZoneReport, ZoneWinner,
};

/// Latitude boundaries used when none are given
pub const DEFAULT_LEVELS: [f64; 4] = [0.0, 18.0, 36.0, 90.0];

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,
    #[error("Invalid latitude levels {0:?}: need at least two ascending values within 0..=90")]
    InvalidLevels(Vec<f64>),
    #[error("No seed satellite in orbit 0 lies within zone {lower}..{upper}")]
    NoSeedForZone { lower: f64, upper: f64 },
    #[error("No candidate motifs for {0}")]
    NoCandidates(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Percentage by which `best` improves on `baseline` (positive is better)
pub fn improvement_percent(baseline: f64, best: f64) -> f64 {
    (baseline - best) * 100.0 / baseline
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Walker-delta stores shared by the search tests

    use constellation_store::geometry::{candidate_links, city_coverage};
    use constellation_store::{City, CityPair, ConstellationStore, WalkerDelta};

    pub fn cities() -> Vec<City> {
        [
            ("Lagos", 6.5, 3.4, 15.4e6),
            ("London", 51.5, -0.1, 9.0e6),
            ("Tokyo", 35.7, 139.7, 37.4e6),
            ("Lima", -12.0, -77.0, 10.7e6),
            ("Sydney", -33.9, 151.2, 5.3e6),
            ("Singapore", 1.3, 103.8, 5.9e6),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(name, lat, lon, pop))| City {
            id: i as u32,
            name: name.into(),
            lat_deg: lat,
            lon_deg: lon,
            population: pop,
        })
        .collect()
    }

    pub fn pairs(count: u32) -> Vec<CityPair> {
        let mut pairs = Vec::new();
        for a in 0..count {
            for b in (a + 1)..count {
                pairs.push(CityPair {
                    city_1: a,
                    city_2: b,
                    geodesic_km: 4000.0 + 650.0 * (a + 2 * b) as f64,
                });
            }
        }
        pairs
    }

    /// 8x8 shell at 53° with every satellite pair as a candidate link
    pub fn walker_store() -> ConstellationStore {
        let walker = WalkerDelta::new(8, 8, 1, 550.0, 53.0);
        let sats = walker.satellites();
        let links = candidate_links(&sats, 1.0e9);
        let cities = cities();
        let coverage = city_coverage(&cities, &sats, 6_000.0);
        let pairs = pairs(cities.len() as u32);
        ConstellationStore::new(walker.config("walker-8x8"), sats, links, cities, coverage, pairs)
            .unwrap()
    }
}
