//! Motif materialisation
//!
//! Applies a motif's two offsets to every satellite, in id order, and adds
//! the resulting ISLs subject to the degree budget and an optional latitude
//! restriction. Rejections are expected control flow and are only counted.

use crate::motif::{Motif, RelativeOffset};
use crate::{EdgeOutcome, Topology, ZoneTag};
use constellation_store::geometry::isl_length_km;
use constellation_store::{ConstellationStore, Satellite};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which satellites a motif may link, by absolute latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LatitudeFilter {
    /// Link everywhere
    Unrestricted,
    /// Both endpoints strictly above `lower`
    Above { lower: f64 },
    /// Both endpoints strictly above `lower`, and the link not entirely
    /// above `upper` nor entirely below `lower`
    Band { lower: f64, upper: f64 },
}

impl LatitudeFilter {
    pub fn admits(&self, a: &Satellite, b: &Satellite) -> bool {
        match *self {
            LatitudeFilter::Unrestricted => true,
            LatitudeFilter::Above { lower } => both_above(a, b, lower),
            LatitudeFilter::Band { lower, upper } => {
                in_band(a, b, lower, upper) && both_above(a, b, lower)
            }
        }
    }
}

fn both_above(a: &Satellite, b: &Satellite, lower: f64) -> bool {
    a.abs_lat() > lower && b.abs_lat() > lower
}

/// A link is out of band only when both endpoints are beyond the same bound.
pub fn in_band(a: &Satellite, b: &Satellite, lower: f64, upper: f64) -> bool {
    let (lower, upper) = (lower.abs(), upper.abs());
    let (la, lb) = (a.abs_lat(), b.abs_lat());
    !((la > upper && lb > upper) || (la < lower && lb < lower))
}

/// Counters from one motif application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub added: usize,
    pub duplicate: usize,
    pub degree_exhausted: usize,
    pub filtered: usize,
    /// Offset landed on an empty grid cell
    pub unresolved: usize,
}

pub struct TopologyBuilder<'a> {
    store: &'a ConstellationStore,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(store: &'a ConstellationStore) -> Self {
        Self { store }
    }

    /// Absolute id of the satellite `offset` away from `sat`
    pub fn neighbor(&self, sat: &Satellite, offset: RelativeOffset) -> Option<u32> {
        let (orbit, slot) = offset.apply(sat, self.store.constellation());
        self.store.satellite_at(orbit, slot)
    }

    /// Add `motif`'s links to `topology` in place
    pub fn apply(
        &self,
        topology: &mut Topology,
        motif: &Motif,
        filter: LatitudeFilter,
        zone: Option<ZoneTag>,
    ) -> BuildSummary {
        let mut summary = BuildSummary::default();

        for sat in self.store.satellites() {
            for offset in motif.offsets {
                let Some(neighbor_id) = self.neighbor(sat, offset) else {
                    summary.unresolved += 1;
                    continue;
                };
                let neighbor = self.store.satellite(neighbor_id);
                if !filter.admits(sat, neighbor) {
                    summary.filtered += 1;
                    continue;
                }
                match topology.add_isl(sat.id, neighbor_id, isl_length_km(sat, neighbor), zone) {
                    EdgeOutcome::Added => summary.added += 1,
                    EdgeOutcome::Duplicate | EdgeOutcome::SelfLoop => summary.duplicate += 1,
                    EdgeOutcome::DegreeExhausted => summary.degree_exhausted += 1,
                }
            }
        }

        debug!(
            "Motif {} ({:?}): {:?}, total ISLs {}",
            motif.index,
            filter,
            summary,
            topology.isl_count()
        );
        summary
    }

    /// Fresh topology with only `motif`'s links
    pub fn build(&self, motif: &Motif, filter: LatitudeFilter, zone: Option<ZoneTag>) -> Topology {
        let mut topology = Topology::from_store(self.store);
        self.apply(&mut topology, motif, filter, zone);
        topology
    }
}
