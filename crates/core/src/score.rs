// R2KS: weighted two-sample rank Kolmogorov-Smirnov score between two ranked lists.
//
// A direct evaluation fills a num_genes x num_genes overlap matrix. Because every
// gene sits at exactly one position in each list, only the frontier of partial sums
// keyed by positions in the reference list ever changes, so we keep that frontier
// (the history) and update it in place as the first list is walked.

use crate::error::{R2ksError, Result};
use crate::ranked::{RankLookup, RankedList};
use crate::weight::WeightTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreConfig {
    pub pivot: u32,
    pub two_tailed: bool,
}

/// Score for one unordered pair of 1-based list indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResult {
    pub i: usize,
    pub j: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    pos_y: u32,
    value: f64,
}

/// Staircase of cumulative weighted overlap, strictly increasing in `pos_y`.
struct History {
    steps: Vec<Step>,
}

impl History {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    /// Adds a gene found at `pos_y` in the reference list with weight `w` and
    /// hands every entry whose value changed to `touched`.
    fn record(&mut self, pos_y: u32, w: f64, mut touched: impl FnMut(&Step)) {
        let last = match self.steps.last() {
            Some(last) => *last,
            None => {
                self.steps.push(Step { pos_y, value: w });
                touched(&self.steps[0]);
                return;
            }
        };

        if pos_y > last.pos_y {
            let step = Step {
                pos_y,
                value: last.value + w,
            };
            self.steps.push(step);
            touched(&step);
            return;
        }

        let mut at = self.steps.len();
        while at > 0 && self.steps[at - 1].pos_y > pos_y {
            at -= 1;
            self.steps[at].value += w;
            touched(&self.steps[at]);
        }
        // Nothing at or below pos_y yet: the floor is an empty prefix.
        let base = if at > 0 { self.steps[at - 1].value } else { 0.0 };
        debug_assert!(at == 0 || self.steps[at - 1].pos_y < pos_y);

        let step = Step {
            pos_y,
            value: base + w,
        };
        self.steps.insert(at, step);
        touched(&step);
    }

    #[cfg(test)]
    fn is_strictly_increasing(&self) -> bool {
        self.steps.windows(2).all(|w| w[0].pos_y < w[1].pos_y)
    }
}

/// Scores pairs of lists drawn from one universe with one pivot.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: WeightTable,
}

impl Scorer {
    pub fn new(num_genes: usize, pivot: u32) -> Result<Self> {
        if num_genes == 0 {
            return Err(R2ksError::EmptyUniverse);
        }
        Ok(Self {
            weights: WeightTable::new(num_genes, pivot),
        })
    }

    pub fn num_genes(&self) -> usize {
        self.weights.num_genes()
    }

    pub fn pivot(&self) -> u32 {
        self.weights.pivot()
    }

    /// Directional score: `list_a` drives the walk, `list_b` is the reference.
    pub fn score(&self, list_a: &RankedList, list_b: &RankedList) -> Result<f64> {
        let num_genes = self.num_genes();
        for list in [list_a, list_b] {
            if list.len() != num_genes {
                return Err(R2ksError::LengthMismatch {
                    left: num_genes,
                    right: list.len(),
                });
            }
        }

        let total_weight = self.weights.total();
        let one_over = 1.0 / (num_genes as f64 * num_genes as f64);
        let rank_in_b = RankLookup::new(list_b);
        let mut history = History::with_capacity(num_genes);
        let mut rvalue = 0.0f64;

        for (i, &gene) in list_a.as_slice().iter().enumerate() {
            let pos_y = rank_in_b.position(gene);
            let w = if i == 0 {
                self.weights.at(0)
            } else {
                self.weights.at(i).min(self.weights.at(pos_y as usize))
            };

            let step_index = i as u64 + 1;
            history.record(pos_y, w, |step| {
                let second_term = ((u64::from(step.pos_y) + 1) * step_index) as f64 * one_over;
                let candidate = step.value / total_weight - second_term;
                if candidate > rvalue {
                    rvalue = candidate;
                }
            });
        }

        Ok(rvalue * (num_genes as f64).sqrt())
    }

    /// Forward score, or the larger of forward and reversed-reference scores.
    pub fn score_pair(
        &self,
        list_a: &RankedList,
        list_b: &RankedList,
        two_tailed: bool,
    ) -> Result<f64> {
        let forward = self.score(list_a, list_b)?;
        if !two_tailed {
            return Ok(forward);
        }
        let reversed = self.score(list_a, &list_b.reversed())?;
        Ok(forward.max(reversed))
    }
}

/// One-off convenience over [`Scorer::score_pair`].
pub fn score(list_a: &RankedList, list_b: &RankedList, config: &ScoreConfig) -> Result<f64> {
    Scorer::new(list_a.len(), config.pivot)?.score_pair(list_a, list_b, config.two_tailed)
}
