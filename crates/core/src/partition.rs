use strum_macros::{Display, EnumString};

use crate::error::{R2ksError, Result};

/// Whether the enumeration includes the degenerate `i == j` pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum PairPolicy {
    #[default]
    #[strum(serialize = "with-self")]
    WithSelf,
    #[strum(serialize = "distinct")]
    DistinctOnly,
}

impl PairPolicy {
    /// First partner `j` for list `i` (both 1-based).
    pub fn first_partner(self, i: usize) -> usize {
        match self {
            PairPolicy::WithSelf => i,
            PairPolicy::DistinctOnly => i + 1,
        }
    }
}

/// Unordered pair of 1-based list indices with `i <= j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListPair {
    pub i: usize,
    pub j: usize,
}

pub fn pair_count(num_lists: usize, policy: PairPolicy) -> usize {
    match policy {
        PairPolicy::WithSelf => num_lists * (num_lists + 1) / 2,
        PairPolicy::DistinctOnly => num_lists * num_lists.saturating_sub(1) / 2,
    }
}

pub fn enumerate_pairs(num_lists: usize, policy: PairPolicy) -> Vec<ListPair> {
    let mut pairs = Vec::with_capacity(pair_count(num_lists, policy));
    for i in 1..=num_lists {
        for j in policy.first_partner(i)..=num_lists {
            pairs.push(ListPair { i, j });
        }
    }
    pairs
}

/// Contiguous slice of the enumeration owned by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkChunk {
    pub worker: usize,
    pub pairs: Vec<ListPair>,
}

/// One chunk per worker, each `total / workers` long; the remainder goes to the
/// last worker.
pub fn split_static(pairs: &[ListPair], workers: usize) -> Result<Vec<WorkChunk>> {
    if workers == 0 {
        return Err(R2ksError::NoWorkers);
    }
    let per_worker = pairs.len() / workers;
    let chunks = (0..workers)
        .map(|worker| {
            let start = worker * per_worker;
            let end = if worker + 1 == workers {
                pairs.len()
            } else {
                start + per_worker
            };
            WorkChunk {
                worker,
                pairs: pairs[start..end].to_vec(),
            }
        })
        .collect();
    Ok(chunks)
}

/// Hands chunks of the enumeration to workers.
pub trait WorkSource {
    /// Total number of pairs this source will hand out.
    fn total_pairs(&self) -> usize;

    fn workers(&self) -> usize;

    /// Next chunk for `worker`, or `None` once it has nothing left.
    fn next_chunk(&mut self, worker: usize) -> Option<WorkChunk>;
}

/// Fixed partition computed once; every chunk is handed out exactly once.
#[derive(Debug)]
pub struct StaticPartition {
    total: usize,
    chunks: Vec<Option<WorkChunk>>,
}

impl StaticPartition {
    pub fn new(num_lists: usize, policy: PairPolicy, workers: usize) -> Result<Self> {
        let pairs = enumerate_pairs(num_lists, policy);
        let chunks = split_static(&pairs, workers)?;
        Ok(Self {
            total: pairs.len(),
            chunks: chunks.into_iter().map(Some).collect(),
        })
    }
}

impl WorkSource for StaticPartition {
    fn total_pairs(&self) -> usize {
        self.total
    }

    fn workers(&self) -> usize {
        self.chunks.len()
    }

    fn next_chunk(&mut self, worker: usize) -> Option<WorkChunk> {
        self.chunks.get_mut(worker).and_then(Option::take)
    }
}
