use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BookError;
use crate::square::Square;

/// Wire and storage value of the pass move.
pub const PASS_MOVE: i8 = -1;

/// A move: a disc placed on a square, or a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Play(Square),
    Pass,
}

impl Move {
    /// Returns the signed index used on the wire and in storage
    /// (0-63 for squares, [`PASS_MOVE`] for a pass).
    pub const fn to_i8(self) -> i8 {
        match self {
            Move::Play(sq) => sq as i8,
            Move::Pass => PASS_MOVE,
        }
    }

    pub fn from_i8(value: i8) -> Result<Move, BookError> {
        if value == PASS_MOVE {
            return Ok(Move::Pass);
        }
        u8::try_from(value)
            .ok()
            .and_then(Square::from_u8)
            .map(Move::Play)
            .ok_or_else(|| BookError::Parse(format!("invalid move index: {value}")))
    }
}

impl From<Square> for Move {
    fn from(sq: Square) -> Self {
        Move::Play(sq)
    }
}

impl FromStr for Move {
    type Err = BookError;

    /// Accepts algebraic squares (`"f5"`, `"F5"`) and the pass spellings
    /// `"ps"`, `"pa"`, `"--"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ps" | "pa" | "--" | "pass" => Ok(Move::Pass),
            other => other.parse::<Square>().map(Move::Play),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Play(sq) => write!(f, "{sq}"),
            Move::Pass => f.write_str("ps"),
        }
    }
}

impl Serialize for Move {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.to_i8())
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i8::deserialize(deserializer)?;
        Move::from_i8(value).map_err(serde::de::Error::custom)
    }
}
