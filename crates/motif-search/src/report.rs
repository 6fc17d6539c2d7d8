//! Result files
//!
//! Text outputs are comma-separated and opened in append mode, so repeated
//! runs accumulate in the same files. `run_summary.json` is rewritten on
//! every run.

use crate::zones::{ZoneReport, ZoneWinner};
use crate::{Result, SearchError};
use chrono::{DateTime, Utc};
use isl_topology::{Motif, MotifScore, Topology};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Score columns of a motif that was never evaluated
const UNSCORED: f64 = -1.0;

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Writer rooted at `output_dir/subdir`, created if missing
    pub fn new(output_dir: impl AsRef<Path>, subdir: &str) -> Result<Self> {
        let dir = output_dir.as_ref().join(subdir);
        fs::create_dir_all(&dir).map_err(|source| SearchError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn single(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(output_dir, "single_motif")
    }

    pub fn multi(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(output_dir, "multi_motif")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<F>(&self, name: &str, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        let path = self.dir.join(name);
        let io_err = |source: io::Error| SearchError::Io {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer).and_then(|_| writer.flush()).map_err(io_err)
    }

    fn write_edges(&self, name: &str, topology: &Topology) -> Result<()> {
        self.append(name, |w| {
            for (a, b, _) in topology.isl_edges() {
                writeln!(w, "{},{}", a, b)?;
            }
            Ok(())
        })?;
        info!("Wrote {} ISLs to {:?}", topology.isl_count(), self.dir.join(name));
        Ok(())
    }

    /// `index,target_1,target_2,stretch,hops` per candidate of the unzoned search
    pub fn write_single_metrics(&self, motifs: &[Motif]) -> Result<()> {
        self.append("level_0_motif_metrics.txt", |w| {
            for motif in motifs {
                let [t1, t2] = match motif.targets {
                    Some([a, b]) => [a.to_string(), b.to_string()],
                    None => ["-".to_string(), "-".to_string()],
                };
                let (stretch, hops) = motif.score.map_or((UNSCORED, UNSCORED), |s| (s.stretch, s.hop_count));
                writeln!(w, "{},{},{},{:?},{:?}", motif.index, t1, t2, stretch, hops)?;
            }
            Ok(())
        })
    }

    pub fn write_single_best(&self, topology: &Topology) -> Result<()> {
        self.write_edges("level_0_best_motif.txt", topology)
    }

    /// Winner line, candidate table and zone edge list for one zone
    pub fn write_zone(&self, report: &ZoneReport) -> Result<()> {
        let zone = report.zone;
        let winner = &report.winner;
        let score = winner.score.unwrap_or(MotifScore {
            stretch: UNSCORED,
            hop_count: UNSCORED,
            metric: UNSCORED,
        });
        let [o1, o2] = winner.offsets;

        self.append("level_wise_best_motif.txt", |w| {
            writeln!(
                w,
                "{:?},{:?},{:?},{:?},{:?},{},{},{},{}",
                zone.lower,
                zone.upper,
                score.stretch,
                score.hop_count,
                score.metric,
                o1.orbit,
                o1.in_orbit,
                o2.orbit,
                o2.in_orbit
            )
        })?;

        self.append(&format!("level_{}_motif_metrics.txt", zone.index), |w| {
            for motif in &report.motifs {
                let (stretch, hops, metric) = motif
                    .score
                    .map_or((UNSCORED, UNSCORED, UNSCORED), |s| (s.stretch, s.hop_count, s.metric));
                writeln!(w, "{},{:?},{:?},{:?}", motif.index, stretch, hops, metric)?;
            }
            Ok(())
        })?;

        self.write_edges(&format!("level_{}_best_motif.txt", zone.index), &report.zone_topology)
    }

    pub fn write_overall(&self, topology: &Topology) -> Result<()> {
        self.write_edges("best_motif_overall.txt", topology)
    }

    pub fn write_improvement(&self, percent: f64) -> Result<()> {
        self.append("metric_improvement.txt", |w| write!(w, "{:?}", percent))
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.dir.join("run_summary.json");
        let io_err = |source: io::Error| SearchError::Io {
            path: path.clone(),
            source,
        };
        let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.flush().map_err(io_err)?;
        info!("Wrote run summary to {:?}", path);
        Ok(())
    }
}

/// Machine-readable record of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: String,
    pub constellation: String,
    pub max_isl_length: String,
    pub workers: usize,
    pub zones: Vec<ZoneWinner>,
    /// Winner of the unzoned search
    pub winner: Option<Motif>,
    pub baseline_metric: Option<f64>,
    /// Metric of the last zone winner
    pub best_metric: Option<f64>,
    /// Metric of the finished topology
    pub final_metric: Option<f64>,
    pub improvement_percent: Option<f64>,
    pub isl_links: usize,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(
        mode: impl Into<String>,
        constellation: impl Into<String>,
        max_isl_length: impl Into<String>,
        workers: usize,
    ) -> Self {
        Self {
            mode: mode.into(),
            constellation: constellation.into(),
            max_isl_length: max_isl_length.into(),
            workers,
            zones: Vec::new(),
            winner: None,
            baseline_metric: None,
            best_metric: None,
            final_metric: None,
            improvement_percent: None,
            isl_links: 0,
            generated_at: Utc::now(),
        }
    }
}
