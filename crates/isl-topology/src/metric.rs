//! Population-weighted latency metric
//!
//! Every city pair is routed over the topology with its two cities' uplinks
//! attached for the duration of that pair only. The composite metric is the
//! weighted average stretch plus the weighted average hop count. A single
//! unreachable pair fails the whole topology.

use crate::motif::MotifScore;
use crate::Topology;
use constellation_store::{ConstellationStore, ResolvedPair};
use petgraph::algo::astar;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

pub const POPULATION_WEIGHT_DIVISOR: f64 = 1.0e7;

/// Weight of a city pair: product of the two populations, scaled down
pub fn pair_weight(population_1: f64, population_2: f64) -> f64 {
    population_1 * population_2 / POPULATION_WEIGHT_DIVISOR
}

/// Outcome of scoring one topology
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Evaluation {
    Scored(MotifScore),
    /// First pair (by store order) with no path; indices into the city list
    Unreachable { city_1: usize, city_2: usize },
}

impl Evaluation {
    /// Score to record, with the sentinel standing in for an unreachable pair
    pub fn score(&self) -> MotifScore {
        match self {
            Evaluation::Scored(score) => *score,
            Evaluation::Unreachable { .. } => MotifScore::unreachable(),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Evaluation::Unreachable { .. })
    }
}

/// Shortest path between the two cities of one pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRoute {
    pub distance_km: f64,
    /// Edges on the path, uplinks included
    pub hops: usize,
    pub stretch: f64,
    pub weight: f64,
}

/// Neumaier-compensated running sum
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::default();
        for v in iter {
            acc.add(v);
        }
        acc
    }
}

/// Per-pair weighted terms, summed in a canonical order so the result does
/// not depend on the order pairs were visited in.
#[derive(Debug, Default)]
struct WeightedSums {
    stretch: Vec<f64>,
    hops: Vec<f64>,
    weight: Vec<f64>,
}

impl WeightedSums {
    fn with_capacity(n: usize) -> Self {
        Self {
            stretch: Vec::with_capacity(n),
            hops: Vec::with_capacity(n),
            weight: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, route: &PairRoute) {
        self.stretch.push(route.stretch * route.weight);
        self.hops.push(route.hops as f64 * route.weight);
        self.weight.push(route.weight);
    }

    fn total(mut terms: Vec<f64>) -> f64 {
        terms.sort_by(f64::total_cmp);
        terms.into_iter().collect::<CompensatedSum>().value()
    }

    fn finish(self) -> MotifScore {
        let weight = Self::total(self.weight);
        if weight == 0.0 {
            warn!("City pair weights sum to zero; reporting a zero metric");
            return MotifScore::new(0.0, 0.0);
        }
        MotifScore::new(Self::total(self.stretch) / weight, Self::total(self.hops) / weight)
    }
}

/// Both cities' uplinks, attached for as long as the guard lives.
struct UplinkGuard<'t> {
    topology: &'t mut Topology,
    attached: usize,
}

impl<'t> UplinkGuard<'t> {
    fn attach(topology: &'t mut Topology, store: &ConstellationStore, pair: &ResolvedPair) -> Self {
        let mut attached = topology.attach_uplinks(pair.city_1, store.uplinks(pair.city_1));
        attached += topology.attach_uplinks(pair.city_2, store.uplinks(pair.city_2));
        Self { topology, attached }
    }

    fn topology(&self) -> &Topology {
        self.topology
    }
}

impl Drop for UplinkGuard<'_> {
    fn drop(&mut self) {
        self.topology.detach_last(self.attached);
    }
}

pub struct MetricEvaluator<'a> {
    store: &'a ConstellationStore,
}

impl<'a> MetricEvaluator<'a> {
    pub fn new(store: &'a ConstellationStore) -> Self {
        Self { store }
    }

    /// Route one pair over `topology` with its uplinks attached.
    ///
    /// Returns `None` when the cities are not connected.
    pub fn route_pair(&self, topology: &mut Topology, pair: &ResolvedPair) -> Option<PairRoute> {
        let guard = UplinkGuard::attach(topology, self.store, pair);
        let topo = guard.topology();
        let target = topo.city_node(pair.city_2);

        let (distance_km, path) = astar(
            topo.graph(),
            topo.city_node(pair.city_1),
            |n| n == target,
            |e| e.weight().length_km,
            |_| 0.0,
        )?;

        Some(PairRoute {
            distance_km,
            hops: path.len().saturating_sub(1),
            stretch: distance_km / pair.geodesic_km,
            weight: pair_weight(
                self.store.city(pair.city_1).population,
                self.store.city(pair.city_2).population,
            ),
        })
    }

    /// Score `topology` over every city pair.
    ///
    /// The topology is borrowed mutably for uplink attachment but is left
    /// with exactly the ISLs it had on entry.
    pub fn evaluate(&self, topology: &mut Topology) -> Evaluation {
        let started = Instant::now();
        let pairs = self.store.pairs();
        let mut sums = WeightedSums::with_capacity(pairs.len());

        for pair in pairs {
            match self.route_pair(topology, pair) {
                Some(route) => sums.push(&route),
                None => {
                    debug!(
                        "No path between {} and {}; topology rejected",
                        self.store.city(pair.city_1).name,
                        self.store.city(pair.city_2).name
                    );
                    return Evaluation::Unreachable {
                        city_1: pair.city_1,
                        city_2: pair.city_2,
                    };
                }
            }
        }

        let score = sums.finish();
        debug!(
            "Metric {:.6} (stretch {:.6}, hops {:.6}) over {} pairs in {:?}",
            score.metric,
            score.stretch,
            score.hop_count,
            pairs.len(),
            started.elapsed()
        );
        Evaluation::Scored(score)
    }
}
