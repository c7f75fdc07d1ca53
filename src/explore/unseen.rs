//! Unseen-edge detection.
//!
//! A position's probe may list fewer moves than the position has legal
//! moves whose successors the database also knows. Counting those gaps
//! identifies nodes worth re-linking when the database is next extended.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use shakmaty::{CastlingMode, Chess, Position};

use crate::db::{OpeningDb, ProbeResult};
use crate::error::ExploreError;
use crate::fen::epd_string;
use crate::packed::PackedKey;
use crate::stats::ExploreStats;

/// Positions with at least one unseen edge, with their edge counts.
#[derive(Debug, Default)]
pub struct UnseenTracker {
    entries: Mutex<FxHashMap<PackedKey, u32>>,
}

impl UnseenTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position's unseen-edge count.
    pub fn record(&self, key: PackedKey, count: u32) {
        self.entries.lock().insert(key, count);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drain into a key-sorted list for deterministic output.
    #[must_use]
    pub fn into_entries(self) -> Vec<(PackedKey, u32)> {
        let mut entries: Vec<_> = self.entries.into_inner().into_iter().collect();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }
}

/// Count the legal moves of `pos` that the probe does not list but whose
/// successors the database knows.
///
/// The probe's raw length (moves plus sentinel) bounds how many unlisted
/// moves can exist, so the walk stops once that many have been checked.
pub(crate) fn count_unseen(
    db: &dyn OpeningDb,
    pos: &Chess,
    probe: &ProbeResult,
    stats: &ExploreStats,
) -> Result<u32, ExploreError> {
    let legal = pos.legal_moves();
    let budget = (legal.len() + 1).saturating_sub(probe.raw_len());
    if budget == 0 {
        return Ok(0);
    }

    let listed: FxHashSet<&str> = probe.moves().iter().map(|entry| entry.uci.as_str()).collect();

    let mut checked = 0usize;
    let mut count = 0u32;
    for mv in &legal {
        if checked == budget {
            break;
        }
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        if listed.contains(uci.as_str()) {
            continue;
        }
        checked += 1;

        let mut next = pos.clone();
        next.play_unchecked(mv);
        stats.add_get();
        let successor = db.probe(&epd_string(&next))?;
        if successor.in_db() {
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SnapshotDb;
    use crate::fen::parse_fen;
    use crate::packed::encode;
    use shakmaty::uci::UciMove;

    const CORNER_KINGS: &str = "k7/8/8/8/8/8/8/K7 w - - 0 1";

    fn child_fen(parent: &Chess, uci: &str) -> String {
        let mv = uci
            .parse::<UciMove>()
            .expect("valid uci")
            .to_move(parent)
            .expect("legal move");
        let mut next = parent.clone();
        next.play_unchecked(&mv);
        epd_string(&next)
    }

    #[test]
    fn test_counts_db_known_unlisted_successors() {
        // White king on a1 has three moves; the probe lists one. Of the
        // two unlisted successors only one is in the database.
        let pos = parse_fen(CORNER_KINGS).expect("parses");
        let mut db = SnapshotDb::new();
        db.insert(epd_string(&pos), 90, vec![("a1a2".to_string(), 0)]);
        db.insert(child_fen(&pos, "a1b1"), 91, vec![]);

        let probe = db.probe(&epd_string(&pos)).expect("probe");
        let stats = ExploreStats::new();
        let count = count_unseen(&db, &pos, &probe, &stats).expect("scan");
        assert_eq!(count, 1);
        // Both unlisted successors were probed.
        assert_eq!(stats.snapshot().gets, 2);
    }

    #[test]
    fn test_fully_listed_position_has_no_budget() {
        let pos = parse_fen(CORNER_KINGS).expect("parses");
        let mut db = SnapshotDb::new();
        db.insert(
            epd_string(&pos),
            90,
            vec![
                ("a1a2".to_string(), 0),
                ("a1b1".to_string(), 0),
                ("a1b2".to_string(), 0),
            ],
        );

        let probe = db.probe(&epd_string(&pos)).expect("probe");
        let stats = ExploreStats::new();
        let count = count_unseen(&db, &pos, &probe, &stats).expect("scan");
        assert_eq!(count, 0);
        assert_eq!(stats.snapshot().gets, 0);
    }

    #[test]
    fn test_null_marker_consumes_budget() {
        // The null marker inflates the stored list, so one fewer unlisted
        // move gets checked.
        let pos = parse_fen(CORNER_KINGS).expect("parses");
        let mut db = SnapshotDb::new();
        db.insert(
            epd_string(&pos),
            90,
            vec![("a1a2".to_string(), 0), ("a0a0".to_string(), 0)],
        );

        let probe = db.probe(&epd_string(&pos)).expect("probe");
        let stats = ExploreStats::new();
        count_unseen(&db, &pos, &probe, &stats).expect("scan");
        assert_eq!(stats.snapshot().gets, 1);
    }

    #[test]
    fn test_tracker_sorted_drain() {
        let tracker = UnseenTracker::new();
        let a = encode(&parse_fen(CORNER_KINGS).expect("parses"));
        let b = encode(&Chess::default());
        tracker.record(a, 2);
        tracker.record(b, 5);
        assert_eq!(tracker.len(), 2);

        let entries = tracker.into_entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
