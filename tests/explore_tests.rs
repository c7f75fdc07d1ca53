//! End-to-end exploration scenarios over an in-memory database.

use parking_lot::Mutex;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Position};

use cdbwalk::db::SnapshotDb;
use cdbwalk::error::ExploreError;
use cdbwalk::fen::epd_string;
use cdbwalk::packed::encode;
use cdbwalk::progress::{progress_index, MAX_PROGRESS};
use cdbwalk::report::{BatchLogger, BatchReport, QuietReporter};
use cdbwalk::{ExploreConfig, ExploreSummary, Explorer};

fn play(pos: &Chess, uci: &str) -> Chess {
    let mv = uci
        .parse::<UciMove>()
        .expect("valid uci")
        .to_move(pos)
        .expect("legal move");
    let mut next = pos.clone();
    next.play_unchecked(&mv);
    next
}

fn insert(db: &mut SnapshotDb, pos: &Chess, ply: i32, moves: &[(&str, i32)]) {
    db.insert(
        epd_string(pos),
        ply,
        moves.iter().map(|(uci, score)| (uci.to_string(), *score)).collect(),
    );
}

fn run(db: &SnapshotDb, seed: &Chess, config: ExploreConfig) -> ExploreSummary {
    Explorer::new(db, config)
        .with_reporter(&QuietReporter)
        .run(seed)
        .expect("exploration succeeds")
}

fn config(depth: i16) -> ExploreConfig {
    ExploreConfig::default().depth(depth).threads(2)
}

/// A small tree below the starting position:
/// three scored first moves, each child with database-known follow-ups.
fn small_tree() -> (SnapshotDb, Chess) {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    insert(&mut db, &seed, 0, &[("e2e4", 30), ("d2d4", 25), ("g1f3", 20)]);

    let after_e4 = play(&seed, "e2e4");
    insert(&mut db, &after_e4, 1, &[("c7c5", 10), ("e7e5", 5)]);
    let after_d4 = play(&seed, "d2d4");
    insert(&mut db, &after_d4, 1, &[("d7d5", 0)]);
    let after_nf3 = play(&seed, "g1f3");
    insert(&mut db, &after_nf3, 1, &[("d7d5", 0)]);

    for (parent, reply) in [
        (&after_e4, "c7c5"),
        (&after_e4, "e7e5"),
        (&after_d4, "d7d5"),
        (&after_nf3, "d7d5"),
    ] {
        insert(&mut db, &play(parent, reply), 2, &[]);
    }

    (db, seed)
}

#[test]
fn depth_zero_visits_only_the_seed() {
    let (db, seed) = small_tree();
    let summary = run(&db, &seed, config(0));

    assert_eq!(summary.total_assigned(), 1);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.ply_counts, vec![1]);
}

#[test]
fn seed_not_in_db_aborts_with_no_results() {
    let db = SnapshotDb::new();
    let err = Explorer::new(&db, config(3))
        .with_reporter(&QuietReporter)
        .run(&Chess::default())
        .unwrap_err();
    assert!(matches!(err, ExploreError::SeedNotInDb));
    assert_eq!(err.to_string(), "Initial fen not in DB!");
}

#[test]
fn cp_loss_prunes_in_score_order() {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    // Best move 30, second move 50 centipawns worse.
    insert(&mut db, &seed, 0, &[("e2e4", 30), ("g2g4", -20)]);
    insert(&mut db, &play(&seed, "e2e4"), 1, &[]);
    insert(&mut db, &play(&seed, "g2g4"), 1, &[]);

    let tight = run(&db, &seed, config(1).max_cp_loss(40));
    assert_eq!(tight.total_assigned(), 2);

    let loose = run(&db, &seed, config(1).max_cp_loss(60));
    assert_eq!(loose.total_assigned(), 3);

    let ties_only = run(&db, &seed, config(1).max_cp_loss(0));
    assert_eq!(ties_only.total_assigned(), 2);

    let unpruned = run(&db, &seed, config(1));
    assert_eq!(unpruned.total_assigned(), 3);
}

#[test]
fn piece_moves_stay_in_the_seed_batch() {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    insert(&mut db, &seed, 0, &[("g1f3", 10)]);
    insert(&mut db, &play(&seed, "g1f3"), 1, &[]);

    let summary = run(&db, &seed, config(1));
    assert_eq!(summary.total_assigned(), 2);
    // A knight move keeps the progress index, so no second batch opens.
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.ply_counts, vec![1, 1]);
}

#[test]
fn pawn_capture_routes_to_a_later_batch() {
    // After 1. e4 d5 the capture exd5 removes a pawn, which lands the
    // successor in a strictly smaller partition.
    let seed = play(&play(&Chess::default(), "e2e4"), "d7d5");
    let taken = play(&seed, "e4d5");
    assert!(progress_index(&taken) < progress_index(&seed));

    let mut db = SnapshotDb::new();
    insert(&mut db, &seed, 2, &[("e4d5", 40)]);
    insert(&mut db, &taken, 3, &[]);

    let summary = run(&db, &seed, config(1));
    assert_eq!(summary.total_assigned(), 2);
    assert_eq!(summary.batches, 2);
}

#[test]
fn sentinel_only_position_contributes_one_visit() {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    insert(&mut db, &seed, 0, &[]);

    let summary = run(&db, &seed, config(5));
    assert_eq!(summary.total_assigned(), 1);
    assert_eq!(summary.totals.hits, 2);
}

#[test]
fn null_marker_is_skipped_but_anchors_pruning() {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    // The null marker holds the best score; the real move is 50 below it.
    insert(&mut db, &seed, 0, &[("a0a0", 100), ("e2e4", 50)]);
    insert(&mut db, &play(&seed, "e2e4"), 1, &[]);

    let tight = run(&db, &seed, config(1).max_cp_loss(40));
    assert_eq!(tight.total_assigned(), 1);

    let loose = run(&db, &seed, config(1).max_cp_loss(60));
    // The null marker itself is never enqueued.
    assert_eq!(loose.total_assigned(), 2);
}

#[test]
fn totals_are_deterministic_across_worker_counts() {
    let (db, seed) = small_tree();

    let single = run(&db, &seed, config(2).threads(1));
    let parallel = run(&db, &seed, config(2).threads(4));
    let again = run(&db, &seed, config(2).threads(4));

    assert_eq!(single.total_assigned(), 8);
    assert_eq!(single.ply_counts, vec![1, 3, 4]);
    assert_eq!(parallel.ply_counts, single.ply_counts);
    assert_eq!(parallel.totals, single.totals);
    assert_eq!(again.totals, parallel.totals);
}

#[test]
fn depth_one_leaves_are_not_expanded() {
    let (db, seed) = small_tree();
    let summary = run(&db, &seed, config(1));

    assert_eq!(summary.total_assigned(), 4);
    assert_eq!(summary.ply_counts, vec![1, 3]);
}

#[test]
fn unseen_edges_are_counted_without_changing_totals() {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    // The probe lists one of the twenty legal moves; two unlisted
    // successors are nevertheless in the database.
    insert(&mut db, &seed, 0, &[("e2e4", 30)]);
    insert(&mut db, &play(&seed, "e2e4"), 1, &[]);
    insert(&mut db, &play(&seed, "d2d4"), 1, &[]);
    insert(&mut db, &play(&seed, "g1f3"), 1, &[]);

    let plain = run(&db, &seed, config(1));
    let tracked = run(&db, &seed, config(1).find_unseen(true));

    assert_eq!(plain.total_assigned(), 2);
    assert_eq!(tracked.total_assigned(), plain.total_assigned());
    assert_eq!(tracked.unseen, vec![(encode(&seed), 2)]);
    assert!(plain.unseen.is_empty());
}

/// Two first moves that transpose into the same position three plies in.
fn transposing_tree() -> (SnapshotDb, Chess) {
    let seed = Chess::default();
    let mut db = SnapshotDb::new();
    insert(&mut db, &seed, 0, &[("e2e4", 30), ("d2d4", 25)]);

    let after_e4 = play(&seed, "e2e4");
    let after_d4 = play(&seed, "d2d4");
    insert(&mut db, &after_e4, 1, &[("d7d6", 0)]);
    insert(&mut db, &after_d4, 1, &[("d7d6", 0)]);

    let via_e4 = play(&after_e4, "d7d6");
    let via_d4 = play(&after_d4, "d7d6");
    insert(&mut db, &via_e4, 2, &[("d2d4", 0)]);
    insert(&mut db, &via_d4, 2, &[("e2e4", 0)]);

    // Both lines reach the same position here.
    let shared = play(&via_e4, "d2d4");
    assert_eq!(epd_string(&shared), epd_string(&play(&via_d4, "e2e4")));
    insert(&mut db, &shared, 3, &[("g8f6", 0)]);
    insert(&mut db, &play(&shared, "g8f6"), 4, &[]);

    (db, seed)
}

#[test]
fn per_move_runs_are_independent_and_double_count_transpositions() {
    let (db, seed) = transposing_tree();

    let runs = Explorer::new(&db, config(3))
        .with_reporter(&QuietReporter)
        .run_independent_first_moves(&seed)
        .expect("per-move exploration succeeds");
    assert_eq!(runs.len(), 20);

    let explored: Vec<_> = runs.iter().filter(|r| r.summary.is_some()).collect();
    assert_eq!(explored.len(), 2);
    let ucis: Vec<&str> = explored.iter().map(|r| r.uci.as_str()).collect();
    assert!(ucis.contains(&"e2e4") && ucis.contains(&"d2d4"));

    // Each sub-run visits its own four positions, counting the shared
    // tail twice because nothing is deduplicated across first moves.
    let per_move_sum: u64 = explored
        .iter()
        .filter_map(|r| r.summary.as_ref())
        .map(ExploreSummary::total_assigned)
        .sum();
    assert_eq!(per_move_sum, 8);

    // One deeper exploration of the seed covers the same nodes plus the
    // seed itself, yet counts the shared tail only once.
    let single = run(&db, &seed, config(4));
    assert_eq!(single.total_assigned(), 7);
    assert!(per_move_sum > single.total_assigned());
}

/// Reporter that captures batch reports for inspection.
struct CollectingReporter {
    reports: Mutex<Vec<BatchReport>>,
}

impl BatchLogger for CollectingReporter {
    fn batch(&self, report: &BatchReport) {
        self.reports.lock().push(report.clone());
    }
}

#[test]
fn batches_run_in_strictly_decreasing_partition_order() {
    let (db, seed) = small_tree();
    let reporter = CollectingReporter { reports: Mutex::new(Vec::new()) };

    Explorer::new(&db, config(2))
        .with_reporter(&reporter)
        .run(&seed)
        .expect("exploration succeeds");

    let reports = reporter.reports.into_inner();
    assert!(!reports.is_empty());
    assert_eq!(reports[0].partition, MAX_PROGRESS);
    assert_eq!(reports[0].piece_count, 32);
    assert_eq!(reports[0].pawn_progress, 96);
    assert!(reports.windows(2).all(|w| w[1].partition < w[0].partition));
    // Once the last batch closes nothing is pending.
    assert_eq!(reports.last().expect("non-empty").pending, 0);
}
