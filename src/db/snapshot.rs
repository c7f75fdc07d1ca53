//! In-memory database loaded from a JSON snapshot.
//!
//! The snapshot maps counterless FENs to a record of scored moves and the
//! position's ply. Records are normalized on load (sorted by descending
//! score) so the expander's monotone pruning break holds even for
//! hand-edited files. Probes are plain reads of the immutable map and
//! need no locking.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::db::{OpeningDb, ProbeEntry, ProbeResult};
use crate::error::DbError;

/// Wire format of one snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    /// Ply of the position itself; never `-2`, absence encodes that
    ply: i32,
    /// Scored moves as `[uci, centipawns]` pairs
    moves: Vec<(String, i32)>,
}

/// Opening database held entirely in memory.
pub struct SnapshotDb {
    positions: FxHashMap<String, ProbeResult>,
}

impl SnapshotDb {
    /// Create an empty database, to be filled with [`SnapshotDb::insert`].
    #[must_use]
    pub fn new() -> Self {
        SnapshotDb { positions: FxHashMap::default() }
    }

    /// Load a snapshot file.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let raw = fs::read_to_string(path).map_err(|err| DbError::Open {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let records: FxHashMap<String, StoredRecord> =
            serde_json::from_str(&raw).map_err(|err| DbError::Parse { reason: err.to_string() })?;

        let mut db = SnapshotDb::new();
        for (fen, record) in records {
            db.insert_record(fen, record)?;
        }
        Ok(db)
    }

    /// Add a position with its scored moves and ply. Moves are sorted by
    /// descending score; the order given is kept only among equal scores.
    pub fn insert(&mut self, fen: impl Into<String>, ply: i32, moves: Vec<(String, i32)>) {
        // Records built programmatically cannot be malformed.
        let record = StoredRecord { ply, moves };
        let fen = fen.into();
        let _ = self.insert_record(fen, record);
    }

    fn insert_record(&mut self, fen: String, record: StoredRecord) -> Result<(), DbError> {
        if record.ply < 0 {
            return Err(DbError::Corrupt {
                fen,
                reason: format!("negative ply {}", record.ply),
            });
        }
        let mut entries: Vec<ProbeEntry> = record
            .moves
            .into_iter()
            .map(|(uci, score)| ProbeEntry::new(uci, score))
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.positions.insert(fen, ProbeResult::new(entries, record.ply));
        Ok(())
    }

    /// Number of stored positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for SnapshotDb {
    fn default() -> Self {
        Self::new()
    }
}

impl OpeningDb for SnapshotDb {
    fn probe(&self, fen: &str) -> Result<ProbeResult, DbError> {
        Ok(self
            .positions
            .get(fen)
            .cloned()
            .unwrap_or_else(ProbeResult::not_in_db))
    }
}
