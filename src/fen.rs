//! FEN handling for database probes.
//!
//! The database keys positions by counterless FEN, so this module emits
//! exactly that form: piece placement, side to move, castling rights and
//! the en passant square, nothing after it. The en passant field is set
//! only when an en passant capture is actually legal, which keeps the FEN
//! and the packed key canonical forms in agreement.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Piece, Position, Rank, Role, Square};

use crate::error::ExploreError;

/// Seed used when no FEN is given: the position after 1. g4.
pub const DEFAULT_SEED_FEN: &str = "rnbqkbnr/pppppppp/8/8/6P1/8/PPPPPP1P/RNBQKBNR b KQkq - 0 1";

/// CLI alias for the standard initial position.
pub const STARTPOS: &str = "startpos";

fn piece_char(piece: Piece) -> char {
    let ch = match piece.role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    };
    if piece.color == Color::White {
        ch.to_ascii_uppercase()
    } else {
        ch
    }
}

/// Render a position as a counterless FEN string.
#[must_use]
pub fn epd_string(pos: &Chess) -> String {
    let setup = pos.clone().into_setup(EnPassantMode::Legal);
    let mut out = String::with_capacity(64);

    for rank in (0..8).rev() {
        let mut empty = 0u32;
        for file in 0..8 {
            let sq = Square::from_coords(File::new(file), Rank::new(rank));
            match setup.board.piece_at(sq) {
                Some(piece) => {
                    if empty > 0 {
                        out.push(char::from_digit(empty, 10).unwrap_or('0'));
                        empty = 0;
                    }
                    out.push(piece_char(piece));
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push(char::from_digit(empty, 10).unwrap_or('0'));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out.push(' ');
    out.push(match setup.turn {
        Color::White => 'w',
        Color::Black => 'b',
    });

    out.push(' ');
    let rights = setup.castling_rights;
    if rights.is_empty() {
        out.push('-');
    } else {
        for (sq, ch) in [
            (Square::H1, 'K'),
            (Square::A1, 'Q'),
            (Square::H8, 'k'),
            (Square::A8, 'q'),
        ] {
            if rights.contains(sq) {
                out.push(ch);
            }
        }
    }

    out.push(' ');
    match setup.ep_square {
        Some(sq) => out.push_str(&sq.to_string()),
        None => out.push('-'),
    }

    out
}

/// Parse a FEN string into a position.
pub fn parse_fen(fen: &str) -> Result<Chess, ExploreError> {
    let parsed = fen
        .parse::<Fen>()
        .map_err(|err| ExploreError::BadFen {
            fen: fen.to_string(),
            reason: err.to_string(),
        })?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|err| ExploreError::BadFen {
            fen: fen.to_string(),
            reason: err.to_string(),
        })
}

/// Resolve the CLI seed argument, accepting `startpos` as an alias.
pub fn seed_position(arg: &str) -> Result<Chess, ExploreError> {
    if arg == STARTPOS {
        Ok(Chess::default())
    } else {
        parse_fen(arg)
    }
}
