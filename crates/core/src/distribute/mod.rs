// Coordinator/worker mode. The coordinator hands every worker its chunk once,
// then streams reports to the sink in arrival order until it holds one per pair.
// Workers never talk to each other and nothing is re-assigned.

pub mod process;
pub mod wire;

use std::thread;

use crossbeam_channel::Receiver;

use crate::emit::ResultSink;
use crate::error::{R2ksError, Result};
use crate::input::ListSource;
use crate::partition::{ListPair, WorkSource};
use crate::score::{PairResult, ScoreConfig, Scorer};
use crate::worker::{score_chunk, RunSummary};

pub use process::{run_processes, serve};

/// One finished pair, tagged with the worker that scored it.
#[derive(Debug)]
pub struct WorkerReport {
    pub worker: usize,
    pub pair: ListPair,
    pub outcome: Result<f64>,
}

/// Forwards reports to `sink` until `expected` have arrived.
///
/// Fails with [`R2ksError::WorkersLost`] if every sender hangs up first.
pub fn collect<S>(
    reports: &Receiver<WorkerReport>,
    expected: usize,
    sink: &mut S,
) -> Result<RunSummary>
where
    S: ResultSink + ?Sized,
{
    let mut summary = RunSummary::default();
    while summary.total() < expected {
        let report = reports.recv().map_err(|_| R2ksError::WorkersLost {
            received: summary.total(),
            expected,
        })?;
        match report.outcome {
            Ok(score) => {
                sink.emit(&PairResult {
                    i: report.pair.i,
                    j: report.pair.j,
                    score,
                })?;
                summary.scored += 1;
            }
            // the worker already logged why
            Err(_) => summary.failed += 1,
        }
    }
    log::info!(
        "coordinator collected {} results ({} failed)",
        summary.total(),
        summary.failed
    );
    Ok(summary)
}

/// Coordinator plus one thread per chunk, exchanging messages only.
pub fn run_channels<L, W, S>(
    source: &L,
    config: &ScoreConfig,
    partition: &mut W,
    sink: &mut S,
) -> Result<RunSummary>
where
    L: ListSource + ?Sized,
    W: WorkSource + ?Sized,
    S: ResultSink + ?Sized,
{
    let header = source.header();
    let scorer = Scorer::new(header.num_genes, config.pivot)?;
    let expected = partition.total_pairs();
    let (tx, rx) = crossbeam_channel::unbounded();

    thread::scope(|scope| {
        for worker in 0..partition.workers() {
            let Some(chunk) = partition.next_chunk(worker) else {
                continue;
            };
            let tx = tx.clone();
            let scorer = &scorer;
            scope.spawn(move || {
                log::debug!("worker {} takes {} pairs", worker, chunk.pairs.len());
                score_chunk(source, scorer, config, &chunk.pairs, |pair, outcome| {
                    let report = WorkerReport {
                        worker,
                        pair,
                        outcome: outcome.map(|result| result.score),
                    };
                    // a closed channel means the coordinator already gave up
                    let _ = tx.send(report);
                });
            });
        }
        drop(tx);
        collect(&rx, expected, sink)
    })
}
