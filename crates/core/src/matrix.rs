// Full ordered-pair score matrix, for callers that want every direction at once
// rather than the `i <= j` pair stream.

use std::io::Write;

use csv::WriterBuilder;
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{R2ksError, Result};
use crate::input::ListSource;
use crate::ranked::RankedList;
use crate::score::{ScoreConfig, Scorer};

/// Loads every list of `source` in index order.
pub fn load_all<L: ListSource + ?Sized>(source: &L) -> Result<Vec<RankedList>> {
    (1..=source.header().num_lists)
        .into_par_iter()
        .map(|index| source.load(index))
        .collect()
}

/// Score of every ordered pair: entry `[a, b]` walks list `a` against reference
/// list `b`, so the matrix is not symmetric in general.
pub fn score_matrix(lists: &[RankedList], config: &ScoreConfig) -> Result<Array2<f64>> {
    let size = lists.len();
    if size == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let num_genes = lists.first().map(RankedList::len).ok_or(R2ksError::EmptyUniverse)?;
    let scorer = Scorer::new(num_genes, config.pivot)?;

    let row_results: Vec<Vec<f64>> = (0..size)
        .into_par_iter()
        .map(|a| {
            lists
                .iter()
                .map(|list_b| scorer.score_pair(&lists[a], list_b, config.two_tailed))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let mut scores = Array2::<f64>::zeros((size, size));
    for (a, row) in row_results.iter().enumerate() {
        for (b, &value) in row.iter().enumerate() {
            scores[[a, b]] = value;
        }
    }
    Ok(scores)
}

/// Tab-separated matrix with 1-based list numbers as row and column labels.
pub fn write_tsv<W: Write>(scores: &Array2<f64>, out: W) -> Result<W> {
    let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(out);

    let labels: Vec<String> = (1..=scores.ncols()).map(|b| b.to_string()).collect();
    wtr.write_record(std::iter::once("").chain(labels.iter().map(String::as_str)))?;

    for (a, row) in scores.rows().into_iter().enumerate() {
        let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let label = (a + 1).to_string();
        wtr.write_record(
            std::iter::once(label.as_str()).chain(values.iter().map(String::as_str)),
        )?;
    }
    wtr.into_inner().map_err(|err| R2ksError::Io(err.into_error()))
}
