//! Latitude-zone assembly and baseline comparison
//!
//! Zones are processed in ascending order. For each zone a seed satellite
//! is chosen, its candidate motifs are scored on top of the topology built
//! so far (links only where both endpoints are above the zone's lower
//! bound), and the winner is committed to the cumulative topology within
//! the zone's band. Only the assembler mutates the cumulative topology, and
//! only once the zone's winner is known.

use crate::driver::{select_best, SearchDriver};
use crate::{Result, SearchError};
use constellation_store::BaselineConfig;
use isl_topology::{
    BuildSummary, Evaluation, LatitudeFilter, MetricEvaluator, Motif, MotifGenerator, Topology,
    TopologyBuilder, ZoneColor, ZoneTag,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Band `[lower, upper)` of absolute latitude, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatitudeZone {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub color: ZoneColor,
}

impl LatitudeZone {
    /// Consecutive zones between ascending latitude levels
    pub fn from_levels(levels: &[f64]) -> Result<Vec<Self>> {
        let in_range = levels.iter().all(|l| (0.0..=90.0).contains(l));
        let ascending = levels.windows(2).all(|w| w[0] < w[1]);
        if levels.len() < 2 || !in_range || !ascending {
            return Err(SearchError::InvalidLevels(levels.to_vec()));
        }
        Ok(levels
            .windows(2)
            .enumerate()
            .map(|(index, w)| Self {
                index,
                lower: w[0],
                upper: w[1],
                color: ZoneColor::for_zone(index),
            })
            .collect())
    }

    pub fn tag(&self) -> ZoneTag {
        ZoneTag {
            color: self.color,
            level: self.lower,
        }
    }

    /// Filter used while scoring this zone's candidates
    pub fn evaluation_filter(&self) -> LatitudeFilter {
        LatitudeFilter::Above { lower: self.lower }
    }

    /// Filter used when committing the winner to the cumulative topology
    pub fn commit_filter(&self) -> LatitudeFilter {
        LatitudeFilter::Band {
            lower: self.lower,
            upper: self.upper,
        }
    }
}

/// Everything known about a zone once its winner is chosen
#[derive(Debug)]
pub struct ZoneReport {
    pub zone: LatitudeZone,
    pub seed: u32,
    /// All scored candidates, by index
    pub motifs: Vec<Motif>,
    pub winner: Motif,
    /// Cumulative topology before commit plus the winner over the lower bound
    pub zone_topology: Topology,
    pub committed: BuildSummary,
}

/// Per-zone outcome kept after assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneWinner {
    pub zone: LatitudeZone,
    pub seed: u32,
    pub candidates: usize,
    pub winner: Motif,
    pub committed_links: usize,
}

#[derive(Debug)]
pub struct Assembly {
    pub topology: Topology,
    pub zones: Vec<ZoneWinner>,
    /// Score of the finished cumulative topology
    pub final_evaluation: Evaluation,
}

impl Assembly {
    /// Metric of the last zone's winner
    pub fn best_metric(&self) -> Option<f64> {
        self.zones.last().and_then(|z| z.winner.metric())
    }
}

/// Fixed-motif reference topology
#[derive(Debug)]
pub struct BaselineRun {
    pub motif: Motif,
    pub topology: Topology,
    pub evaluation: Evaluation,
}

impl BaselineRun {
    pub fn metric(&self) -> f64 {
        self.evaluation.score().metric
    }
}

/// Winner of the unzoned search seeded at satellite 0
#[derive(Debug)]
pub struct SingleRun {
    pub motifs: Vec<Motif>,
    pub winner: Motif,
    pub topology: Topology,
}

pub struct ZoneAssembler<'d, 'a> {
    driver: &'d SearchDriver<'a>,
}

impl<'d, 'a> ZoneAssembler<'d, 'a> {
    pub fn new(driver: &'d SearchDriver<'a>) -> Self {
        Self { driver }
    }

    /// Build the multi-zone topology, handing each zone's report to
    /// `on_zone` as soon as it is complete.
    pub fn assemble<F>(&self, zones: &[LatitudeZone], mut on_zone: F) -> Result<Assembly>
    where
        F: FnMut(&ZoneReport) -> Result<()>,
    {
        let store = self.driver.store();
        let generator = MotifGenerator::new(store);
        let builder = TopologyBuilder::new(store);
        let mut cumulative = Topology::from_store(store);
        let mut winners = Vec::with_capacity(zones.len());

        for zone in zones {
            let seed = generator
                .seed_for_zone(zone.lower, zone.upper)
                .ok_or(SearchError::NoSeedForZone {
                    lower: zone.lower,
                    upper: zone.upper,
                })?;
            let mut motifs = generator.motifs_for_seed(seed);
            info!(
                "Zone {} [{}, {}): seed satellite {} ({:.2}°), {} candidate motifs",
                zone.index,
                zone.lower,
                zone.upper,
                seed,
                store.satellite(seed).lat_deg,
                motifs.len()
            );
            if motifs.is_empty() {
                return Err(SearchError::NoCandidates(format!(
                    "zone [{}, {}) seed {}",
                    zone.lower, zone.upper, seed
                )));
            }

            self.driver
                .evaluate_all(&cumulative, &mut motifs, zone.evaluation_filter());
            let winner = select_best(&motifs)
                .cloned()
                .ok_or_else(|| SearchError::NoCandidates(format!("zone [{}, {})", zone.lower, zone.upper)))?;

            let mut zone_topology = cumulative.clone();
            builder.apply(&mut zone_topology, &winner, zone.evaluation_filter(), Some(zone.tag()));
            let committed = builder.apply(&mut cumulative, &winner, zone.commit_filter(), Some(zone.tag()));

            info!(
                "Zone {} winner: motif {} {:?}, metric {:.6}; committed {} links, {} ISLs total",
                zone.index,
                winner.index,
                winner.offsets,
                winner.metric().unwrap_or_default(),
                committed.added,
                cumulative.isl_count()
            );

            let report = ZoneReport {
                zone: *zone,
                seed,
                motifs,
                winner,
                zone_topology,
                committed,
            };
            on_zone(&report)?;
            winners.push(ZoneWinner {
                zone: *zone,
                seed,
                candidates: report.motifs.len(),
                winner: report.winner,
                committed_links: committed.added,
            });
        }

        let final_evaluation = MetricEvaluator::new(store).evaluate(&mut cumulative);
        let stats = cumulative.stats();
        info!(
            "Assembled topology: {} ISLs, max degree {}, metric {:.6}",
            stats.isl_links,
            stats.max_satellite_degree,
            final_evaluation.score().metric
        );
        if final_evaluation.is_unreachable() {
            warn!("Assembled topology leaves city pairs unreachable: {:?}", final_evaluation);
        }

        Ok(Assembly {
            topology: cumulative,
            zones: winners,
            final_evaluation,
        })
    }

    /// Score the configured baseline motif over its lower latitude bound
    pub fn baseline(&self, config: &BaselineConfig) -> BaselineRun {
        let store = self.driver.store();
        let mut motif = Motif::from_offsets(0, config.offsets);
        let tag = ZoneTag {
            color: ZoneColor::None,
            level: config.lat_bottom,
        };
        let mut topology = TopologyBuilder::new(store).build(
            &motif,
            LatitudeFilter::Above {
                lower: config.lat_bottom,
            },
            Some(tag),
        );
        let evaluation = MetricEvaluator::new(store).evaluate(&mut topology);
        motif.score = Some(evaluation.score());
        info!(
            "Baseline motif {:?}: metric {:.6} over {} ISLs",
            motif.offsets,
            evaluation.score().metric,
            topology.isl_count()
        );
        BaselineRun {
            motif,
            topology,
            evaluation,
        }
    }

    /// Unzoned search over the motifs of satellite 0
    pub fn single_motif(&self) -> Result<SingleRun> {
        let store = self.driver.store();
        let mut motifs = MotifGenerator::new(store).motifs_for_seed(0);
        info!("Satellite 0 yields {} candidate motifs", motifs.len());
        if motifs.is_empty() {
            return Err(SearchError::NoCandidates("satellite 0".to_string()));
        }

        let base = Topology::from_store(store);
        self.driver
            .evaluate_all(&base, &mut motifs, LatitudeFilter::Unrestricted);
        let winner = select_best(&motifs)
            .cloned()
            .ok_or_else(|| SearchError::NoCandidates("satellite 0".to_string()))?;
        let topology = TopologyBuilder::new(store).build(&winner, LatitudeFilter::Unrestricted, None);
        info!(
            "Best motif {} {:?}: metric {:.6}, {} ISLs",
            winner.index,
            winner.offsets,
            winner.metric().unwrap_or_default(),
            topology.isl_count()
        );

        Ok(SingleRun {
            motifs,
            winner,
            topology,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::walker_store;
    use crate::DEFAULT_LEVELS;
    use isl_topology::builder::in_band;
    use isl_topology::DEGREE_BUDGET;

    #[test]
    fn test_zones_from_levels() {
        let zones = LatitudeZone::from_levels(&DEFAULT_LEVELS).unwrap();
        assert_eq!(zones.len(), 3);
        assert_eq!((zones[1].lower, zones[1].upper), (18.0, 36.0));
        assert_eq!(zones[2].color, ZoneColor::Red);
        assert_eq!(zones[0].tag().level, 0.0);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        for levels in [vec![0.0], vec![0.0, 36.0, 18.0], vec![0.0, 95.0], vec![-5.0, 10.0], vec![10.0, 10.0]] {
            assert!(matches!(
                LatitudeZone::from_levels(&levels),
                Err(SearchError::InvalidLevels(_))
            ));
        }
    }

    #[test]
    fn test_assembly_respects_zone_bands() {
        let store = walker_store();
        let driver = SearchDriver::new(&store, 4).unwrap();
        let zones = LatitudeZone::from_levels(&DEFAULT_LEVELS).unwrap();

        let mut seen = Vec::new();
        let assembly = ZoneAssembler::new(&driver)
            .assemble(&zones, |report| {
                assert!(report.motifs.iter().all(|m| m.score.is_some()));
                assert!(report.zone_topology.stats().max_satellite_degree <= DEGREE_BUDGET);
                seen.push((report.zone.index, report.seed));
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![(0, 0), (1, 1), (2, 1)]);
        assert_eq!(assembly.zones.len(), 3);
        assert!(assembly.topology.stats().max_satellite_degree <= DEGREE_BUDGET);

        let committed: usize = assembly.zones.iter().map(|z| z.committed_links).sum();
        assert_eq!(assembly.topology.isl_count(), committed);

        for (a, b, link) in assembly.topology.isl_edges() {
            let tag = link.zone.unwrap();
            let zone = zones.iter().find(|z| z.lower == tag.level).unwrap();
            assert_eq!(tag.color, zone.color);
            let (sa, sb) = (store.satellite(a), store.satellite(b));
            assert!(in_band(sa, sb, zone.lower, zone.upper));
            assert!(sa.abs_lat() > zone.lower && sb.abs_lat() > zone.lower);
        }
        assert_eq!(assembly.best_metric(), assembly.zones[2].winner.metric());
    }

    #[test]
    fn test_observer_error_aborts_assembly() {
        let store = walker_store();
        let driver = SearchDriver::new(&store, 2).unwrap();
        let zones = LatitudeZone::from_levels(&DEFAULT_LEVELS).unwrap();
        let mut calls = 0;
        let result = ZoneAssembler::new(&driver).assemble(&zones, |_| {
            calls += 1;
            Err(SearchError::NoCandidates("stop".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zone_without_seed() {
        let store = walker_store();
        let driver = SearchDriver::new(&store, 2).unwrap();
        // First-quadrant seeds sit at 0° and ~34°
        let zones = LatitudeZone::from_levels(&[50.0, 60.0]).unwrap();
        let err = ZoneAssembler::new(&driver).assemble(&zones, |_| Ok(())).unwrap_err();
        assert!(matches!(err, SearchError::NoSeedForZone { .. }));
    }

    #[test]
    fn test_baseline_grid() {
        let store = walker_store();
        let driver = SearchDriver::new(&store, 1).unwrap();
        let config = BaselineConfig {
            lat_bottom: 0.0,
            lat_top: Some(90.0),
            offsets: [(0, 1), (1, 0)],
        };
        let baseline = ZoneAssembler::new(&driver).baseline(&config);

        assert!(!baseline.evaluation.is_unreachable());
        assert!(baseline.metric() > 0.0);
        assert_eq!(baseline.motif.metric(), Some(baseline.metric()));
        assert!(baseline
            .topology
            .isl_edges()
            .all(|(_, _, l)| l.zone.map(|t| t.color) == Some(ZoneColor::None)));
    }

    #[test]
    fn test_single_motif_winner_is_minimum() {
        let store = walker_store();
        let driver = SearchDriver::new(&store, 3).unwrap();
        let run = ZoneAssembler::new(&driver).single_motif().unwrap();

        let best = run.winner.metric().unwrap();
        assert!(run.motifs.iter().all(|m| m.metric().unwrap() >= best));
        let first = run.motifs.iter().position(|m| m.metric() == Some(best)).unwrap();
        assert_eq!(first, run.winner.index);
        assert!(run.topology.isl_count() > 0);
    }
}
