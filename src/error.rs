//! Error types for database access and exploration.

use std::fmt;

/// Error type for opening-database failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The snapshot file could not be opened or read
    Open { path: String, reason: String },
    /// The snapshot file could not be parsed
    Parse { reason: String },
    /// A stored record is malformed
    Corrupt { fen: String, reason: String },
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Open { path, reason } => {
                write!(f, "Cannot open database '{path}': {reason}")
            }
            DbError::Parse { reason } => {
                write!(f, "Cannot parse database snapshot: {reason}")
            }
            DbError::Corrupt { fen, reason } => {
                write!(f, "Corrupt record for '{fen}': {reason}")
            }
        }
    }
}

impl std::error::Error for DbError {}

/// Error type for packed-key decoding failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedError {
    /// A nibble holds a code outside the defined range
    BadCode { code: u8, square: u8 },
    /// The double-push marker sits on a rank where no double push ends
    BadDoublePushRank { square: u8 },
    /// The decoded material does not form a legal position
    IllegalPosition { reason: String },
}

impl fmt::Display for PackedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackedError::BadCode { code, square } => {
                write!(f, "Invalid piece code {code} at square index {square}")
            }
            PackedError::BadDoublePushRank { square } => {
                write!(f, "Double-push marker on impossible square index {square}")
            }
            PackedError::IllegalPosition { reason } => {
                write!(f, "Decoded position is not legal: {reason}")
            }
        }
    }
}

impl std::error::Error for PackedError {}

/// Error type for a whole exploration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreError {
    /// The seed position is not present in the database
    SeedNotInDb,
    /// The seed FEN string failed to parse
    BadFen { fen: String, reason: String },
    /// A database failure surfaced mid-run
    Db(DbError),
    /// A stored key failed to decode back into a position
    Key(PackedError),
    /// A move string returned by the database does not parse against its
    /// position, which indicates a corrupt record or a rules mismatch
    MoveParse { uci: String, fen: String },
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::SeedNotInDb => write!(f, "Initial fen not in DB!"),
            ExploreError::BadFen { fen, reason } => {
                write!(f, "Invalid FEN '{fen}': {reason}")
            }
            ExploreError::Db(err) => write!(f, "{err}"),
            ExploreError::Key(err) => write!(f, "{err}"),
            ExploreError::MoveParse { uci, fen } => {
                write!(f, "Database move '{uci}' is not playable from '{fen}'")
            }
        }
    }
}

impl std::error::Error for ExploreError {}

impl From<DbError> for ExploreError {
    fn from(err: DbError) -> Self {
        ExploreError::Db(err)
    }
}

impl From<PackedError> for ExploreError {
    fn from(err: PackedError) -> Self {
        ExploreError::Key(err)
    }
}
