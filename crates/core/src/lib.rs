pub mod distribute;
pub mod emit;
pub mod error;
pub mod input;
pub mod matrix;
pub mod parallel;
pub mod partition;
pub mod ranked;
pub mod score;
pub mod weight;
pub mod worker;

pub use error::{R2ksError, Result};
pub use input::{Header, InMemoryLists, ListSource, RankFile};
pub use partition::{PairPolicy, StaticPartition, WorkSource};
pub use ranked::RankedList;
pub use score::{score, PairResult, ScoreConfig, Scorer};
pub use weight::weight;
pub use worker::RunSummary;
