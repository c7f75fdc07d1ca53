//! Opening-database probe interface.
//!
//! A probe answers with the scored moves known for a position, best
//! first, plus a sentinel carrying the position's ply in the database.
//! The sentinel ply is `-2` when the position is unknown. Move lists may
//! contain the null marker `a0a0`, which consumers must skip.

mod snapshot;

pub use snapshot::SnapshotDb;

use crate::error::DbError;

/// Null-move marker occasionally present in stored move lists.
pub const NULL_MOVE: &str = "a0a0";

/// Sentinel ply meaning "position not in the database".
pub const NOT_IN_DB_PLY: i32 = -2;

/// One scored move from a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEntry {
    /// UCI move string; may be the `a0a0` null marker
    pub uci: String,
    /// Score in centipawns from the side to move
    pub score: i32,
}

impl ProbeEntry {
    #[must_use]
    pub fn new(uci: impl Into<String>, score: i32) -> Self {
        ProbeEntry { uci: uci.into(), score }
    }

    /// Whether this entry is the null marker rather than a real move.
    #[must_use]
    pub fn is_null_marker(&self) -> bool {
        self.uci == NULL_MOVE
    }
}

/// Result of probing one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    entries: Vec<ProbeEntry>,
    ply: i32,
}

impl ProbeResult {
    /// Build a result from scored moves (best first) and the sentinel ply.
    #[must_use]
    pub fn new(entries: Vec<ProbeEntry>, ply: i32) -> Self {
        ProbeResult { entries, ply }
    }

    /// The result returned for positions the database does not know.
    #[must_use]
    pub fn not_in_db() -> Self {
        ProbeResult { entries: Vec::new(), ply: NOT_IN_DB_PLY }
    }

    #[must_use]
    pub fn in_db(&self) -> bool {
        self.ply != NOT_IN_DB_PLY
    }

    /// Ply recorded for the position itself, `-2` if unknown.
    #[must_use]
    pub fn ply(&self) -> i32 {
        self.ply
    }

    /// The scored moves, sentinel excluded, best first.
    #[must_use]
    pub fn moves(&self) -> &[ProbeEntry] {
        &self.entries
    }

    /// Length of the stored list including the sentinel. The unseen-edge
    /// arithmetic is defined against this raw length.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.entries.len() + 1
    }

    /// Score of the first stored entry, the pruning reference.
    ///
    /// This is the first entry even if it happens to be the null marker.
    #[must_use]
    pub fn best_score(&self) -> Option<i32> {
        self.entries.first().map(|entry| entry.score)
    }
}

/// Read access to the opening database.
///
/// Implementations must be safe to probe from many threads at once, and
/// must return moves sorted by descending score. Any failure is fatal to
/// the run.
pub trait OpeningDb: Send + Sync {
    fn probe(&self, fen: &str) -> Result<ProbeResult, DbError>;
}
