//! Parallel search driver
//!
//! Motifs are evaluated in batches of at most `workers`. Each task clones
//! the base topology, applies its motif, scores it and sends the result
//! back over a channel. The end of the pool scope is the batch barrier;
//! results are written back by position only after it.

use crate::{Result, SearchError};
use constellation_store::ConstellationStore;
use crossbeam_channel::unbounded;
use isl_topology::{Evaluation, LatitudeFilter, MetricEvaluator, Motif, Topology, TopologyBuilder};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Evaluation of the motif at `index` in the candidate list
#[derive(Debug, Clone, Copy)]
pub struct MotifResult {
    pub index: usize,
    pub evaluation: Evaluation,
}

pub struct SearchDriver<'a> {
    store: &'a ConstellationStore,
    pool: ThreadPool,
    workers: usize,
}

impl<'a> SearchDriver<'a> {
    pub fn new(store: &'a ConstellationStore, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SearchError::InvalidWorkerCount);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("motif-worker-{i}"))
            .build()?;
        Ok(Self {
            store,
            pool,
            workers,
        })
    }

    pub fn store(&self) -> &'a ConstellationStore {
        self.store
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Score every motif on top of `base`, storing the result on the motif.
    ///
    /// `base` is never modified; every evaluation works on its own copy.
    pub fn evaluate_all(&self, base: &Topology, motifs: &mut [Motif], filter: LatitudeFilter) {
        let started = Instant::now();
        let builder = TopologyBuilder::new(self.store);
        let evaluator = MetricEvaluator::new(self.store);
        let batches = motifs.len().div_ceil(self.workers);

        for (batch_no, start) in (0..motifs.len()).step_by(self.workers).enumerate() {
            let end = (start + self.workers).min(motifs.len());
            let batch = &motifs[start..end];
            let (tx, rx) = unbounded::<MotifResult>();

            self.pool.scope(|scope| {
                for (offset, motif) in batch.iter().enumerate() {
                    let tx = tx.clone();
                    let (builder, evaluator) = (&builder, &evaluator);
                    scope.spawn(move |_| {
                        let mut topology = base.clone();
                        builder.apply(&mut topology, motif, filter, None);
                        let evaluation = evaluator.evaluate(&mut topology);
                        // Receiver outlives the scope
                        let _ = tx.send(MotifResult {
                            index: start + offset,
                            evaluation,
                        });
                    });
                }
            });
            drop(tx);

            for result in rx.try_iter() {
                let score = result.evaluation.score();
                debug!(
                    "Motif {} {:?}: metric {:.6}",
                    result.index, motifs[result.index].offsets, score.metric
                );
                motifs[result.index].score = Some(score);
            }
            info!("Batch {}/{} done ({} motifs)", batch_no + 1, batches, end - start);
        }

        info!(
            "Evaluated {} motifs with {} workers in {:?}",
            motifs.len(),
            self.workers,
            started.elapsed()
        );
    }
}

/// Motif with the lowest metric; the earliest wins ties.
///
/// Unscored motifs are ignored.
pub fn select_best(motifs: &[Motif]) -> Option<&Motif> {
    let mut best: Option<&Motif> = None;
    for motif in motifs {
        let Some(metric) = motif.metric() else {
            continue;
        };
        if best.and_then(|b| b.metric()).map_or(true, |m| metric < m) {
            best = Some(motif);
        }
    }
    if let Some(winner) = best {
        if winner.score.is_some_and(|s| s.is_unreachable()) {
            warn!(
                "Best motif {} leaves city pairs unreachable (metric {})",
                winner.index,
                winner.metric().unwrap_or_default()
            );
        }
    }
    best
}
