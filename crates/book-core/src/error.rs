//! Error types shared by the book crates.

use thiserror::Error;

use crate::position::Position;
use crate::moves::Move;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// The two disc masks overlap.
    #[error("invalid position: me {me:#018x} and opp {opp:#018x} overlap")]
    InvalidPosition { me: u64, opp: u64 },

    #[error("illegal move {mv} in position {position}")]
    IllegalMove { position: Position, mv: Move },

    #[error("no evaluation for position {0}")]
    NotFound(Position),

    #[error("invalid evaluation: {0}")]
    InvalidEvaluation(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, BookError>;
