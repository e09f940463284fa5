// Shared-memory mode: rows of the pair triangle run on the rayon pool, each
// iteration loading its own lists and history. The sink is the only shared
// state and is locked per result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::emit::ResultSink;
use crate::error::{R2ksError, Result};
use crate::input::ListSource;
use crate::partition::{ListPair, PairPolicy};
use crate::score::{ScoreConfig, Scorer};
use crate::worker::{score_chunk, RunSummary};

pub fn run_shared<L, S>(
    source: &L,
    config: &ScoreConfig,
    policy: PairPolicy,
    sink: &mut S,
) -> Result<RunSummary>
where
    L: ListSource + ?Sized,
    S: ResultSink + Send + ?Sized,
{
    let header = source.header();
    let scorer = Scorer::new(header.num_genes, config.pivot)?;
    let num_lists = header.num_lists;
    log::info!(
        "scoring {} lists on {} threads",
        num_lists,
        rayon::current_num_threads()
    );

    let sink = Mutex::new(sink);
    let scored = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    (1..=num_lists).into_par_iter().try_for_each(|i| {
        let partners: Vec<ListPair> = (policy.first_partner(i)..=num_lists)
            .map(|j| ListPair { i, j })
            .collect();

        let mut emit_error: Option<R2ksError> = None;
        score_chunk(source, &scorer, config, &partners, |_, outcome| match outcome {
            Ok(result) => {
                if emit_error.is_some() {
                    return;
                }
                let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                match sink.emit(&result) {
                    Ok(()) => {
                        scored.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => emit_error = Some(err),
                }
            }
            Err(_) => {
                failed.fetch_add(1, Ordering::Relaxed);
            }
        });
        emit_error.map_or(Ok(()), Err)
    })?;

    let summary = RunSummary {
        scored: scored.into_inner(),
        failed: failed.into_inner(),
    };
    log::info!(
        "shared-memory run finished: {} scored, {} failed",
        summary.scored,
        summary.failed
    );
    Ok(summary)
}
