//! ISL Topology
//!
//! Graph layer for the motif search:
//!
//! - Topology of satellites + cities with a hard per-satellite degree budget
//! - Motif generation relative to a seed satellite
//! - Motif materialisation across the whole constellation or a latitude band
//! - Population-weighted stretch / hop-count scoring over city pairs

use constellation_store::{ConstellationStore, Uplink};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod builder;
pub mod metric;
pub mod motif;

pub use builder::{BuildSummary, LatitudeFilter, TopologyBuilder};
pub use metric::{Evaluation, MetricEvaluator};
pub use motif::{Motif, MotifGenerator, MotifScore, RelativeOffset};

/// Maximum simultaneous links per satellite
pub const DEGREE_BUDGET: usize = 4;

/// Node in the topology graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyNode {
    Satellite { id: u32 },
    /// Index into [`ConstellationStore::cities`]
    City { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Inter-satellite link (laser)
    InterSatellite,
    /// City to satellite, only present while a pair is being routed
    Uplink,
}

/// Display color assigned to a latitude zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneColor {
    Green,
    Blue,
    Red,
    None,
}

impl ZoneColor {
    /// Colors cycle green → blue → red by zone index
    pub fn for_zone(index: usize) -> Self {
        [ZoneColor::Green, ZoneColor::Blue, ZoneColor::Red][index % 3]
    }
}

impl fmt::Display for ZoneColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoneColor::Green => "green",
            ZoneColor::Blue => "blue",
            ZoneColor::Red => "red",
            ZoneColor::None => "NONE",
        };
        f.write_str(name)
    }
}

/// Zone attributes stamped on an ISL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneTag {
    pub color: ZoneColor,
    /// Lower latitude bound of the zone that placed the link
    pub level: f64,
}

/// An edge in the topology graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopologyLink {
    pub kind: LinkKind,
    pub length_km: f64,
    pub zone: Option<ZoneTag>,
}

/// Result of an ISL insertion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Added,
    /// Link already present
    Duplicate,
    /// One endpoint already carries [`DEGREE_BUDGET`] links
    DegreeExhausted,
    SelfLoop,
}

/// Satellites and cities with the ISLs placed so far.
///
/// Satellite `id` lives at node index `id`; city `i` at `satellite_count + i`.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<TopologyNode, TopologyLink>,
    satellite_count: usize,
}

impl Topology {
    /// Graph with all nodes and no edges
    pub fn new(satellite_count: usize, city_count: usize) -> Self {
        let mut graph = UnGraph::with_capacity(satellite_count + city_count, satellite_count * 2);
        for id in 0..satellite_count {
            graph.add_node(TopologyNode::Satellite { id: id as u32 });
        }
        for index in 0..city_count {
            graph.add_node(TopologyNode::City { index });
        }
        Self {
            graph,
            satellite_count,
        }
    }

    pub fn from_store(store: &ConstellationStore) -> Self {
        Self::new(store.satellites().len(), store.cities().len())
    }

    pub fn satellite_node(&self, id: u32) -> NodeIndex {
        NodeIndex::new(id as usize)
    }

    pub fn city_node(&self, index: usize) -> NodeIndex {
        NodeIndex::new(self.satellite_count + index)
    }

    pub fn degree(&self, sat: u32) -> usize {
        self.graph.edges(self.satellite_node(sat)).count()
    }

    pub fn has_link(&self, a: u32, b: u32) -> bool {
        self.graph
            .find_edge(self.satellite_node(a), self.satellite_node(b))
            .is_some()
    }

    /// Add an ISL unless it is a self-loop, already present, or either
    /// endpoint has exhausted the degree budget.
    pub fn add_isl(&mut self, a: u32, b: u32, length_km: f64, zone: Option<ZoneTag>) -> EdgeOutcome {
        if a == b {
            return EdgeOutcome::SelfLoop;
        }
        if self.has_link(a, b) {
            return EdgeOutcome::Duplicate;
        }
        if self.degree(a) >= DEGREE_BUDGET || self.degree(b) >= DEGREE_BUDGET {
            return EdgeOutcome::DegreeExhausted;
        }
        self.graph.add_edge(
            self.satellite_node(a),
            self.satellite_node(b),
            TopologyLink {
                kind: LinkKind::InterSatellite,
                length_km,
                zone,
            },
        );
        EdgeOutcome::Added
    }

    /// ISLs as `(sat_a, sat_b, link)` in insertion order
    pub fn isl_edges(&self) -> impl Iterator<Item = (u32, u32, &TopologyLink)> + '_ {
        self.graph
            .edge_references()
            .filter(|e| e.weight().kind == LinkKind::InterSatellite)
            .filter_map(move |e| match (self.graph[e.source()], self.graph[e.target()]) {
                (TopologyNode::Satellite { id: a }, TopologyNode::Satellite { id: b }) => {
                    Some((a, b, e.weight()))
                }
                _ => None,
            })
    }

    pub fn isl_count(&self) -> usize {
        self.isl_edges().count()
    }

    /// Attach every uplink of one city; returns how many edges were added.
    pub(crate) fn attach_uplinks(&mut self, city: usize, uplinks: &[Uplink]) -> usize {
        let city_node = self.city_node(city);
        for uplink in uplinks {
            self.graph.add_edge(
                city_node,
                self.satellite_node(uplink.satellite),
                TopologyLink {
                    kind: LinkKind::Uplink,
                    length_km: uplink.distance_km,
                    zone: None,
                },
            );
        }
        uplinks.len()
    }

    /// Remove the `count` most recently added edges.
    ///
    /// Removing from the tail keeps every other edge index stable.
    pub(crate) fn detach_last(&mut self, count: usize) {
        for _ in 0..count {
            let Some(last) = self.graph.edge_count().checked_sub(1) else {
                return;
            };
            debug_assert_eq!(self.graph[EdgeIndex::new(last)].kind, LinkKind::Uplink);
            self.graph.remove_edge(EdgeIndex::new(last));
        }
    }

    pub(crate) fn graph(&self) -> &UnGraph<TopologyNode, TopologyLink> {
        &self.graph
    }

    pub fn stats(&self) -> TopologyStats {
        let mut isl_links = 0;
        let mut uplinks = 0;
        for edge in self.graph.edge_references() {
            match edge.weight().kind {
                LinkKind::InterSatellite => isl_links += 1,
                LinkKind::Uplink => uplinks += 1,
            }
        }
        let max_satellite_degree = (0..self.satellite_count as u32)
            .map(|id| self.degree(id))
            .max()
            .unwrap_or(0);

        TopologyStats {
            satellites: self.satellite_count,
            cities: self.graph.node_count() - self.satellite_count,
            isl_links,
            uplinks,
            max_satellite_degree,
        }
    }
}

/// Topology statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyStats {
    pub satellites: usize,
    pub cities: usize,
    pub isl_links: usize,
    pub uplinks: usize,
    pub max_satellite_degree: usize,
}
