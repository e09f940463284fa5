use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, R2ksError>;

#[derive(Debug, Error)]
pub enum R2ksError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to write results: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("gene universe is empty (num_genes = 0)")]
    EmptyUniverse,

    #[error("list {list}: gene identifier {gene} is outside [0, {num_genes})")]
    GeneOutOfRange {
        list: usize,
        gene: u64,
        num_genes: usize,
    },

    #[error("list {list}: gene identifier {gene} appears more than once")]
    DuplicateGene { list: usize, gene: u32 },

    #[error("list {list}: expected {expected} genes, found {found}")]
    Truncated {
        list: usize,
        expected: usize,
        found: usize,
    },

    #[error("list {list} is not present (source holds {available} lists)")]
    MissingList { list: usize, available: usize },

    #[error("list {list}: token {token:?} is not a gene identifier")]
    InvalidToken { list: usize, token: String },

    #[error("ranked lists differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("collected {received} of {expected} results before every worker exited")]
    WorkersLost { received: usize, expected: usize },

    #[error("worker {worker} could not score pair {i}_{j}")]
    RemoteFailure { worker: usize, i: usize, j: usize },

    #[error("wire protocol violation: {0}")]
    Protocol(String),
}
