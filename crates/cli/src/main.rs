// Score every pair of ranked gene lists in a rank file with R2KS.
// `threads` shares memory on the rayon pool; `channels` and `processes` run a
// coordinator that hands each worker one contiguous chunk of pairs.

use std::{
    env,
    error::Error,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Command,
    time::Instant,
};

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use env_logger::Env;
use strum_macros::{Display, EnumString};

use r2ks::distribute::{run_channels, run_processes, serve};
use r2ks::emit::{Output, TextEmitter};
use r2ks::matrix;
use r2ks::parallel::run_shared;
use r2ks::{ListSource, PairPolicy, RankFile, RunSummary, ScoreConfig, StaticPartition};

#[derive(EnumString, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
enum Mode {
    Threads,
    Channels,
    #[strum(serialize = "processes", serialize = "mpi", to_string = "processes")]
    Processes,
}

#[derive(Parser, Debug)]
#[command(
    name = "r2ks",
    version,
    about = "Weighted rank KS similarity between every pair of ranked gene lists"
)]
struct Args {
    /// Rank file: `num_genes num_lists`, then one list per line (plain or .gz).
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Pivot rank for early-rank weighting; 0 scores unweighted.
    #[arg(short = 'w', long = "pivot", default_value_t = 0)]
    pivot: u32,

    /// Also score against the reversed second list and keep the larger score.
    #[arg(short = 't', long = "two-tailed")]
    two_tailed: bool,

    /// threads, channels or processes.
    #[arg(long, default_value = "threads")]
    mode: Mode,

    /// Worker count for channels and processes modes.
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Thread pool size for threads mode (default: all available cores).
    #[arg(long)]
    threads: Option<usize>,

    /// Leave out the i == j pairs.
    #[arg(long)]
    distinct_only: bool,

    /// Write results here instead of stdout (.gz and .tar.gz are compressed).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// After a clean run, also write the full ordered-pair score matrix here (TSV).
    #[arg(long)]
    matrix: Option<PathBuf>,

    #[arg(long, hide = true)]
    worker: bool,

    extra: Vec<String>,
}

/// Parses the command line, reporting and dropping flags it does not know.
fn parse_args() -> Args {
    let mut argv: Vec<OsString> = env::args_os().collect();
    loop {
        let err = match Args::try_parse_from(argv.iter()) {
            Ok(args) => return args,
            Err(err) => err,
        };
        if err.kind() != ErrorKind::UnknownArgument {
            err.exit();
        }
        let flag = match err.get(ContextKind::InvalidArg) {
            Some(ContextValue::String(flag)) => flag.clone(),
            _ => err.exit(),
        };
        let with_value = format!("{flag}=");
        let Some(at) = argv.iter().skip(1).position(|arg| {
            arg.to_str()
                .is_some_and(|arg| arg == flag || arg.starts_with(&with_value))
        }) else {
            err.exit();
        };
        eprintln!("unrecognized option '{flag}' ignored");
        argv.remove(at + 1);
    }
}

fn worker_command(exe: &Path, args: &Args) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg("--worker")
        .arg("-f")
        .arg(&args.file)
        .arg("-w")
        .arg(args.pivot.to_string());
    if args.two_tailed {
        cmd.arg("-t");
    }
    cmd
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = parse_args();

    let config = ScoreConfig {
        pivot: args.pivot,
        two_tailed: args.two_tailed,
    };
    let source = RankFile::open(&args.file)?;

    if args.worker {
        let summary = serve(&source, &config, io::stdin().lock(), io::stdout().lock())?;
        log::debug!(
            "worker {} done: {} scored, {} failed",
            std::process::id(),
            summary.scored,
            summary.failed
        );
        return Ok(());
    }

    if !args.extra.is_empty() {
        eprintln!("non-option ARGV-elements: {}", args.extra.join(" "));
    }

    // Configure thread pool
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| format!("Failed to set thread pool: {}", e))?;
    }

    let header = source.header();
    let policy = if args.distinct_only {
        PairPolicy::DistinctOnly
    } else {
        PairPolicy::WithSelf
    };
    log::info!(
        "{}: {} genes, {} lists, pivot {}, pairs {}, mode {}",
        args.file.display(),
        header.num_genes,
        header.num_lists,
        args.pivot,
        policy,
        args.mode
    );

    let mut emitter = TextEmitter::new(Output::create(args.output.as_deref())?);
    if args.output.is_none() {
        emitter = emitter.line_buffered();
    }
    let start = Instant::now();

    let summary: RunSummary = match args.mode {
        Mode::Threads => run_shared(&source, &config, policy, &mut emitter)?,
        Mode::Channels | Mode::Processes if args.workers <= 1 => {
            log::info!("single worker: scoring without a coordinator");
            run_shared(&source, &config, policy, &mut emitter)?
        }
        Mode::Channels => {
            let mut partition = StaticPartition::new(header.num_lists, policy, args.workers)?;
            run_channels(&source, &config, &mut partition, &mut emitter)?
        }
        Mode::Processes => {
            let exe = env::current_exe()?;
            let mut partition = StaticPartition::new(header.num_lists, policy, args.workers)?;
            run_processes(
                |_| worker_command(&exe, &args),
                &mut partition,
                &mut emitter,
            )?
        }
    };

    emitter.finish(start.elapsed())?.finish()?;

    if summary.failed > 0 {
        return Err(format!(
            "{} of {} pairs could not be scored",
            summary.failed,
            summary.total()
        )
        .into());
    }

    if let Some(path) = &args.matrix {
        let lists = matrix::load_all(&source)?;
        let scores = matrix::score_matrix(&lists, &config)?;
        matrix::write_tsv(&scores, Output::create(Some(path))?)?.finish()?;
        log::info!("{} lists: matrix written to {}", lists.len(), path.display());
    }
    Ok(())
}
