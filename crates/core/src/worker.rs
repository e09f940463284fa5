use crate::error::Result;
use crate::input::ListSource;
use crate::partition::ListPair;
use crate::score::{PairResult, ScoreConfig, Scorer};

/// Outcome counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scored: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.scored + self.failed
    }
}

/// Loads both lists of `pair` and scores them.
pub fn score_listed_pair<L: ListSource + ?Sized>(
    source: &L,
    scorer: &Scorer,
    config: &ScoreConfig,
    pair: ListPair,
) -> Result<PairResult> {
    let list_a = source.load(pair.i)?;
    let list_b = source.load(pair.j)?;
    let score = scorer.score_pair(&list_a, &list_b, config.two_tailed)?;
    Ok(PairResult {
        i: pair.i,
        j: pair.j,
        score,
    })
}

/// Scores every pair of a chunk in order, handing each outcome to `report` as
/// soon as it is known.
pub fn score_chunk<L, F>(
    source: &L,
    scorer: &Scorer,
    config: &ScoreConfig,
    pairs: &[ListPair],
    mut report: F,
) where
    L: ListSource + ?Sized,
    F: FnMut(ListPair, Result<PairResult>),
{
    for &pair in pairs {
        let outcome = score_listed_pair(source, scorer, config, pair);
        if let Err(err) = &outcome {
            log::error!("pair {}_{}: {}", pair.i, pair.j, err);
        }
        report(pair, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::R2ksError;
    use crate::input::InMemoryLists;
    use crate::ranked::RankedList;

    #[test]
    fn failed_pairs_are_reported_not_skipped() {
        let source = InMemoryLists::new(vec![
            RankedList::new(vec![0, 1, 2, 3]).unwrap(),
            RankedList::new(vec![3, 2, 1, 0]).unwrap(),
        ])
        .unwrap();
        let scorer = Scorer::new(4, 0).unwrap();
        let pairs = [
            ListPair { i: 1, j: 1 },
            ListPair { i: 1, j: 5 },
            ListPair { i: 1, j: 2 },
        ];

        let mut seen = Vec::new();
        score_chunk(&source, &scorer, &ScoreConfig::default(), &pairs, |pair, outcome| {
            seen.push((pair, outcome))
        });

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1.as_ref().unwrap().score, 0.5);
        assert!(matches!(seen[1].1, Err(R2ksError::MissingList { list: 5, .. })));
        assert_eq!(seen[2].1.as_ref().unwrap().score, 0.0);
        assert_eq!(seen[2].0, ListPair { i: 1, j: 2 });
    }
}
