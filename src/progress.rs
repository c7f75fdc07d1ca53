//! Game-progress ordinal for partition scheduling.
//!
//! Maps a position to an integer that never increases along a legal game:
//! captures shrink the piece count, pawn moves shrink the summed distance
//! of all pawns to their promotion ranks. Batching pending work by this
//! ordinal guarantees that successors of a batch land only in partitions
//! that have not been processed yet.

use shakmaty::{Chess, Color, Position};

/// Width of the pawn-progress band inside one piece-count band.
/// Sixteen pawns, at most six ranks from promotion each.
pub const PAWN_SPAN: u16 = 97;

/// Largest possible progress index (32 pieces, all pawns on start ranks).
pub const MAX_PROGRESS: u16 = 3006;

/// Number of progress partitions, `0..=MAX_PROGRESS`.
pub const PARTITIONS: usize = MAX_PROGRESS as usize + 1;

/// Compute the progress index of a position.
///
/// `(piece_count - 2) * PAWN_SPAN + pawn_progress`, where `pawn_progress`
/// sums each pawn's distance to its own promotion rank. A non-capture
/// piece move leaves the index unchanged; every capture or pawn move
/// strictly decreases it.
#[must_use]
pub fn progress_index(pos: &Chess) -> u16 {
    let board = pos.board();
    let piece_count = board.occupied().count() as u16;
    (piece_count - 2) * PAWN_SPAN + pawn_progress(pos)
}

/// Summed distance of all pawns to their promotion ranks, `0..=96`.
#[must_use]
pub fn pawn_progress(pos: &Chess) -> u16 {
    let board = pos.board();
    let mut total = 0u16;
    for sq in board.pawns() & board.by_color(Color::White) {
        total += 7 - sq.rank() as u16;
    }
    for sq in board.pawns() & board.by_color(Color::Black) {
        total += sq.rank() as u16;
    }
    total
}

/// Piece count encoded in a progress index.
#[inline]
#[must_use]
pub fn partition_piece_count(partition: u16) -> u16 {
    partition / PAWN_SPAN + 2
}

/// Pawn progress encoded in a progress index.
#[inline]
#[must_use]
pub fn partition_pawn_progress(partition: u16) -> u16 {
    partition % PAWN_SPAN
}
