use std::io::{BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;

use crossbeam_channel::Sender;

use crate::emit::ResultSink;
use crate::error::{R2ksError, Result};
use crate::input::ListSource;
use crate::partition::WorkSource;
use crate::score::{ScoreConfig, Scorer};
use crate::worker::{score_listed_pair, RunSummary};

use super::wire::{self, ResultRecord};
use super::{collect, WorkerReport};

/// Coordinator side: spawns one child per non-empty chunk, writes the chunk to
/// its stdin and relays the records it prints back as reports.
///
/// `command` builds the child for a worker index; it must run [`serve`].
pub fn run_processes<W, S, F>(
    mut command: F,
    partition: &mut W,
    sink: &mut S,
) -> Result<RunSummary>
where
    W: WorkSource + ?Sized,
    S: ResultSink + ?Sized,
    F: FnMut(usize) -> Command,
{
    let expected = partition.total_pairs();
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut relays = Vec::new();

    for worker in 0..partition.workers() {
        let Some(chunk) = partition.next_chunk(worker) else {
            continue;
        };
        if chunk.pairs.is_empty() {
            continue;
        }
        let mut child = command(worker)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| R2ksError::Protocol(format!("worker {worker} has no stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| R2ksError::Protocol(format!("worker {worker} has no stdout")))?;

        log::debug!(
            "worker {} (pid {}) takes {} pairs",
            worker,
            child.id(),
            chunk.pairs.len()
        );
        wire::write_chunk(&mut stdin, &chunk.pairs)?;
        drop(stdin);

        let tx = tx.clone();
        relays.push(thread::spawn(move || relay(worker, child, stdout, tx)));
    }
    drop(tx);

    let collected = collect(&rx, expected, sink);
    drop(rx);
    for handle in relays {
        if handle.join().is_err() {
            log::error!("a worker relay thread panicked");
        }
    }
    collected
}

fn relay(worker: usize, mut child: Child, stdout: ChildStdout, tx: Sender<WorkerReport>) {
    // the pipe closes when `reader` drops, so a worker we stop listening to
    // cannot block on a full stdout before we wait on it
    {
        let mut reader = BufReader::new(stdout);
        loop {
            let report = match wire::read_record(&mut reader) {
                Ok(Some(record)) => record.into_report(worker),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            match report {
                Ok(report) => {
                    if tx.send(report).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::error!("worker {worker}: {err}");
                    break;
                }
            }
        }
    }
    drop(tx);

    match child.wait() {
        Ok(status) if !status.success() => log::error!("worker {worker} exited with {status}"),
        Ok(_) => log::debug!("worker {worker} finished"),
        Err(err) => log::error!("worker {worker}: {err}"),
    }
}

/// Worker side: reads one chunk from `input`, scores it and writes a record per
/// pair to `output` as each one completes.
pub fn serve<L, R, W>(
    source: &L,
    config: &ScoreConfig,
    mut input: R,
    output: W,
) -> Result<RunSummary>
where
    L: ListSource + ?Sized,
    R: Read,
    W: Write,
{
    let pairs = wire::read_chunk(&mut input)?;
    let scorer = Scorer::new(source.header().num_genes, config.pivot)?;
    let mut output = BufWriter::new(output);
    let mut summary = RunSummary::default();

    for pair in pairs {
        let outcome = score_listed_pair(source, &scorer, config, pair).map(|result| result.score);
        match &outcome {
            Ok(_) => summary.scored += 1,
            Err(err) => {
                log::error!("pair {}_{}: {}", pair.i, pair.j, err);
                summary.failed += 1;
            }
        }
        wire::write_record(&mut output, &ResultRecord::new(pair, &outcome)?)?;
        output.flush()?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InMemoryLists;
    use crate::partition::{ListPair, PairPolicy, StaticPartition};
    use crate::ranked::RankedList;
    use std::io::Cursor;

    fn source() -> InMemoryLists {
        InMemoryLists::new(vec![
            RankedList::new(vec![0, 1, 2, 3]).unwrap(),
            RankedList::new(vec![3, 2, 1, 0]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn serve_answers_every_pair_in_order() {
        let pairs = [
            ListPair { i: 1, j: 1 },
            ListPair { i: 1, j: 2 },
            ListPair { i: 2, j: 9 },
        ];
        let mut request = Vec::new();
        wire::write_chunk(&mut request, &pairs).unwrap();

        let mut reply = Vec::new();
        let summary = serve(
            &source(),
            &ScoreConfig::default(),
            Cursor::new(request),
            &mut reply,
        )
        .unwrap();
        assert_eq!(summary, RunSummary { scored: 2, failed: 1 });
        assert_eq!(reply.len(), 3 * wire::RECORD_LEN);

        let mut input = Cursor::new(reply);
        let first = wire::read_record(&mut input).unwrap().unwrap();
        assert_eq!((first.i, first.j, first.result), (1, 1, 0.5));
        let second = wire::read_record(&mut input).unwrap().unwrap();
        assert_eq!((second.i, second.j, second.result), (1, 2, 0.0));
        let third = wire::read_record(&mut input).unwrap().unwrap();
        assert_eq!((third.i, third.j), (2, 9));
        assert!(third.result.is_nan());
        assert!(wire::read_record(&mut input).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn silent_children_are_reported_as_lost() {
        let mut partition = StaticPartition::new(3, PairPolicy::WithSelf, 2).unwrap();
        let mut results = Vec::new();
        let err = run_processes(
            |_| {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg("cat > /dev/null");
                cmd
            },
            &mut partition,
            &mut results,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            R2ksError::WorkersLost {
                received: 0,
                expected: 6
            }
        ));
    }
}
