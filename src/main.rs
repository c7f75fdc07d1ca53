//! Command-line front end.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use shakmaty::Chess;

use cdbwalk::db::{OpeningDb, SnapshotDb};
use cdbwalk::error::ExploreError;
use cdbwalk::fen::{epd_string, seed_position, DEFAULT_SEED_FEN};
use cdbwalk::packed::{decode, PackedKey};
use cdbwalk::report::{print_summary, QuietReporter};
use cdbwalk::{default_thread_count, ExploreConfig, Explorer};

const UNSEEN_PATH: &str = "unseen.epd";

#[derive(Parser)]
#[command(
    name = "cdbwalk",
    about = "Bounded parallel exploration of the positions reachable inside a chess opening database"
)]
struct Cli {
    /// Seed position as a FEN string, or "startpos"
    #[arg(long, default_value = DEFAULT_SEED_FEN)]
    fen: String,

    /// Maximum exploration depth in plies
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(i16).range(0..))]
    depth: i16,

    /// Prune moves scored more than this many centipawns below the best move
    #[arg(long = "maxCPLoss", default_value_t = i32::MAX)]
    max_cp_loss: i32,

    /// Path to the opening database snapshot
    #[arg(long)]
    db: PathBuf,

    /// Worker threads per depth step (default: one per logical core)
    #[arg(long)]
    threads: Option<usize>,

    /// Explore each legal first move of the seed independently
    #[arg(long)]
    moves: bool,

    /// Record positions with database-known successors missing from their
    /// probe result, and write them to unseen.epd
    #[arg(long = "findUnseenEdges")]
    find_unseen_edges: bool,
}

/// Failures that end the process, keyed to their exit codes.
#[derive(Debug)]
enum RunError {
    Explore(ExploreError),
    Io(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Explore(err) => write!(f, "{err}"),
            RunError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl From<ExploreError> for RunError {
    fn from(err: ExploreError) -> Self {
        RunError::Explore(err)
    }
}

impl From<cdbwalk::error::DbError> for RunError {
    fn from(err: cdbwalk::error::DbError) -> Self {
        RunError::Explore(ExploreError::Db(err))
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Io(err)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Explore(ExploreError::SeedNotInDb)) => {
            println!("{}", ExploreError::SeedNotInDb);
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let seed = seed_position(&cli.fen)?;

    println!("Exploring fen: {}", epd_string(&seed));
    println!("Max depth: {}", cli.depth);
    println!("Opening DB: {}", cli.db.display());
    let db = SnapshotDb::open(&cli.db)?;

    let config = ExploreConfig::default()
        .depth(cli.depth)
        .max_cp_loss(cli.max_cp_loss)
        .threads(cli.threads.unwrap_or_else(default_thread_count))
        .find_unseen(cli.find_unseen_edges);

    if cli.moves {
        run_per_move(&db, &seed, &config)
    } else {
        run_single(&db, &seed, &config)
    }
}

fn run_single(db: &dyn OpeningDb, seed: &Chess, config: &ExploreConfig) -> Result<(), RunError> {
    let summary = Explorer::new(db, config.clone()).run(seed)?;
    print_summary(&summary);

    if config.find_unseen {
        write_unseen(Path::new(UNSEEN_PATH), &summary.unseen)?;
        println!(
            "Unseen edges: {} positions written to {UNSEEN_PATH}",
            summary.unseen.len()
        );
    }
    Ok(())
}

/// Print one row per legal first move of the seed, each explored
/// independently by the library.
fn run_per_move(db: &dyn OpeningDb, seed: &Chess, config: &ExploreConfig) -> Result<(), RunError> {
    let quiet = QuietReporter;
    let runs = Explorer::new(db, config.clone())
        .with_reporter(&quiet)
        .run_independent_first_moves(seed)?;

    let mut merged_unseen: BTreeMap<PackedKey, u32> = BTreeMap::new();
    let mut assigned_sum = 0u64;
    let mut gets_sum = 0u64;

    for run in runs {
        let Some(summary) = run.summary else {
            println!("{}: not in DB", run.uci);
            continue;
        };
        println!(
            "{}: assigned {:>12}  gets {:>12}  batches {:>6}  time {:.3}s",
            run.uci,
            summary.total_assigned(),
            summary.totals.gets,
            summary.batches,
            summary.elapsed.as_secs_f64()
        );
        assigned_sum += summary.total_assigned();
        gets_sum += summary.totals.gets;
        for (key, count) in summary.unseen {
            merged_unseen
                .entry(key)
                .and_modify(|stored| *stored = (*stored).max(count))
                .or_insert(count);
        }
    }

    println!("Per-move totals (independent runs, duplicates counted per move):");
    println!("  assigned {assigned_sum}  gets {gets_sum}");

    if config.find_unseen {
        let entries: Vec<(PackedKey, u32)> = merged_unseen.into_iter().collect();
        write_unseen(Path::new(UNSEEN_PATH), &entries)?;
        println!(
            "Unseen edges: {} positions written to {UNSEEN_PATH}",
            entries.len()
        );
    }
    Ok(())
}

fn write_unseen(path: &Path, entries: &[(PackedKey, u32)]) -> Result<(), RunError> {
    let mut out = BufWriter::new(File::create(path)?);
    for (key, count) in entries {
        let pos = decode(key).map_err(ExploreError::from)?;
        writeln!(out, "{} c0 \"unseen moves: {count}\";", epd_string(&pos))?;
    }
    out.flush()?;
    Ok(())
}
