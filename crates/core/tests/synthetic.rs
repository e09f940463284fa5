use std::io::Write;

use r2ks::distribute::run_channels;
use r2ks::parallel::run_shared;
use r2ks::{ListSource, PairPolicy, PairResult, RankFile, ScoreConfig, StaticPartition};
use tempfile::NamedTempFile;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn rank_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write fixture");
    file
}

fn by_pair(mut results: Vec<PairResult>) -> Vec<PairResult> {
    results.sort_by_key(|r| (r.i, r.j));
    results
}

#[test]
fn synthetic_pairwise_checks() {
    // identity, reversal, identity
    let file = rank_file("4 3\n0 1 2 3\n3 2 1 0\n0 1 2 3\n");
    let source = RankFile::open(file.path()).expect("header");

    let mut results = Vec::new();
    let summary = run_shared(
        &source,
        &ScoreConfig::default(),
        PairPolicy::WithSelf,
        &mut results,
    )
    .expect("run");
    assert_eq!(summary.scored, 6);

    let results = by_pair(results);
    let score = |i: usize, j: usize| {
        results
            .iter()
            .find(|r| r.i == i && r.j == j)
            .map(|r| r.score)
            .expect("pair scored")
    };
    assert!(approx_eq(score(1, 1), 0.5, 1e-12));
    assert!(approx_eq(score(1, 2), 0.0, 1e-12));
    assert!(approx_eq(score(1, 3), 0.5, 1e-12));
    assert!(approx_eq(score(2, 3), 0.0, 1e-12));
}

#[test]
fn synthetic_two_tailed_checks() {
    let file = rank_file("4 2\n0 1 2 3\n3 2 1 0\n");
    let source = RankFile::open(file.path()).expect("header");
    let config = ScoreConfig {
        pivot: 0,
        two_tailed: true,
    };

    let mut results = Vec::new();
    run_shared(&source, &config, PairPolicy::DistinctOnly, &mut results).expect("run");
    assert_eq!(results.len(), 1);
    assert_eq!((results[0].i, results[0].j), (1, 2));
    assert!(approx_eq(results[0].score, 0.5, 1e-12));
}

#[test]
fn modes_agree_on_file_input() {
    let file = rank_file(
        "6 5\n\
         0 1 2 3 4 5\n\
         5 4 3 2 1 0\n\
         2 0 1 5 3 4\n\
         1 3 5 0 2 4\n\
         4 5 0 1 2 3\n",
    );
    let source = RankFile::open(file.path()).expect("header");
    assert_eq!(source.header().num_lists, 5);
    let config = ScoreConfig {
        pivot: 3,
        two_tailed: false,
    };

    let mut shared = Vec::new();
    run_shared(&source, &config, PairPolicy::WithSelf, &mut shared).expect("shared run");

    let mut partition = StaticPartition::new(5, PairPolicy::WithSelf, 3).expect("partition");
    let mut distributed = Vec::new();
    let summary = run_channels(&source, &config, &mut partition, &mut distributed)
        .expect("channel run");
    assert_eq!(summary.scored, 15);
    assert_eq!(by_pair(shared), by_pair(distributed));
}

#[test]
fn corrupt_list_fails_only_its_pairs() {
    let file = rank_file("3 3\n0 1 2\n0 1 9\n2 1 0\n");
    let source = RankFile::open(file.path()).expect("header");

    let mut results = Vec::new();
    let summary = run_shared(
        &source,
        &ScoreConfig::default(),
        PairPolicy::WithSelf,
        &mut results,
    )
    .expect("run");
    // every pair touching list 2: (1,2), (2,2), (2,3)
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.scored, 3);
    assert!(results.iter().all(|r| r.i != 2 && r.j != 2));
}
