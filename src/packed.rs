//! Compact 24-byte position keys.
//!
//! The key is the identity used for deduplication everywhere: an occupancy
//! bitboard followed by one nibble per occupied square. Castling rights,
//! the en passant square and the side to move are folded into spare nibble
//! codes, so the encoding is a bijection on the position state that a
//! counterless FEN represents. Hash collisions are therefore impossible,
//! unlike with a 64-bit zobrist key.

use std::fmt;
use std::num::NonZeroU32;

use shakmaty::{
    Bitboard, Board, CastlingMode, Chess, Color, EnPassantMode, FromSetup, Position, Rank, Role,
    Setup, Square,
};

use crate::error::PackedError;

/// Size of a packed key in bytes.
pub const PACKED_LEN: usize = 24;

// Nibble codes 0..=5 are white PNBRQK, 6..=11 black PNBRQK. The remaining
// codes carry the non-board state:
const CODE_CASTLING_ROOK: u8 = 12;
const CODE_DOUBLE_PUSH_PAWN: u8 = 13;
const CODE_BLACK_KING_TO_MOVE: u8 = 14;

const BLACK_OFFSET: u8 = 6;

/// A 24-byte canonical position key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackedKey([u8; PACKED_LEN]);

impl PackedKey {
    /// View the raw bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PACKED_LEN] {
        &self.0
    }

    /// Rebuild a key from raw bytes, without validation.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: [u8; PACKED_LEN]) -> Self {
        PackedKey(bytes)
    }
}

impl fmt::Debug for PackedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedKey(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

fn role_code(role: Role) -> u8 {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

fn code_role(code: u8) -> Role {
    match code % BLACK_OFFSET {
        0 => Role::Pawn,
        1 => Role::Knight,
        2 => Role::Bishop,
        3 => Role::Rook,
        4 => Role::Queen,
        _ => Role::King,
    }
}

/// Encode a position into its canonical packed key.
#[must_use]
pub fn encode(pos: &Chess) -> PackedKey {
    let setup = pos.clone().into_setup(EnPassantMode::Legal);
    let occupied = setup.board.occupied();

    // The square carrying the double-push marker, if an en passant capture
    // is legal. The pusher was the side that just moved.
    let double_push_sq = setup.ep_square.and_then(|ep| match setup.turn {
        Color::White => ep.offset(-8),
        Color::Black => ep.offset(8),
    });

    let mut bytes = [0u8; PACKED_LEN];
    bytes[..8].copy_from_slice(&occupied.0.to_le_bytes());

    for (i, sq) in occupied.into_iter().enumerate() {
        let Some(piece) = setup.board.piece_at(sq) else {
            continue;
        };
        let code = if piece.role == Role::Rook && setup.castling_rights.contains(sq) {
            CODE_CASTLING_ROOK
        } else if piece.role == Role::Pawn && double_push_sq == Some(sq) {
            CODE_DOUBLE_PUSH_PAWN
        } else if piece.role == Role::King
            && piece.color == Color::Black
            && setup.turn == Color::Black
        {
            CODE_BLACK_KING_TO_MOVE
        } else {
            role_code(piece.role) + if piece.color == Color::Black { BLACK_OFFSET } else { 0 }
        };

        let byte = &mut bytes[8 + i / 2];
        if i % 2 == 0 {
            *byte |= code;
        } else {
            *byte |= code << 4;
        }
    }

    PackedKey(bytes)
}

/// Decode a packed key back into the position it encodes.
pub fn decode(key: &PackedKey) -> Result<Chess, PackedError> {
    let bytes = key.as_bytes();
    let mut occ_bytes = [0u8; 8];
    occ_bytes.copy_from_slice(&bytes[..8]);
    let occupied = Bitboard(u64::from_le_bytes(occ_bytes));
    if occupied.count() > 32 {
        return Err(PackedError::IllegalPosition {
            reason: format!("{} occupied squares", occupied.count()),
        });
    }

    let mut board = Board::empty();
    let mut castling_rights = Bitboard::EMPTY;
    let mut ep_square: Option<Square> = None;
    let mut turn = Color::White;

    for (i, sq) in occupied.into_iter().enumerate() {
        let byte = bytes[8 + i / 2];
        let code = if i % 2 == 0 { byte & 0x0f } else { byte >> 4 };

        let piece = match code {
            0..=11 => {
                let color = if code < BLACK_OFFSET { Color::White } else { Color::Black };
                code_role(code).of(color)
            }
            CODE_CASTLING_ROOK => {
                let color = match sq.rank() {
                    Rank::First => Color::White,
                    Rank::Eighth => Color::Black,
                    _ => {
                        return Err(PackedError::BadCode { code, square: sq as u8 });
                    }
                };
                castling_rights |= Bitboard::from(sq);
                Role::Rook.of(color)
            }
            CODE_DOUBLE_PUSH_PAWN => match sq.rank() {
                Rank::Fourth => {
                    ep_square = sq.offset(-8);
                    Role::Pawn.of(Color::White)
                }
                Rank::Fifth => {
                    ep_square = sq.offset(8);
                    Role::Pawn.of(Color::Black)
                }
                _ => {
                    return Err(PackedError::BadDoublePushRank { square: sq as u8 });
                }
            },
            CODE_BLACK_KING_TO_MOVE => {
                turn = Color::Black;
                Role::King.of(Color::Black)
            }
            _ => {
                return Err(PackedError::BadCode { code, square: sq as u8 });
            }
        };

        board.set_piece_at(sq, piece);
    }

    let setup = Setup {
        board,
        turn,
        castling_rights,
        ep_square,
        halfmoves: 0,
        fullmoves: NonZeroU32::MIN,
        ..Setup::empty()
    };

    Chess::from_setup(setup, CastlingMode::Standard)
        .map_err(|err| PackedError::IllegalPosition { reason: err.to_string() })
}
