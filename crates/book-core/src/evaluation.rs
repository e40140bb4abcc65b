//! Engine evaluations of positions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};
use crate::level::{
    Level, MAX_LEVEL, MIN_LEARN_LEVEL, is_savable_position, round_up_to_even,
};
use crate::moves::Move;
use crate::position::Position;
use crate::symmetry::{Symmetry, canonicalize, rotate, rotate_move};

/// Highest depth an evaluation may report.
pub const MAX_DEPTH: u8 = 60;

/// Highest absolute score.
pub const MAX_SCORE: i8 = 64;

/// Certainty of an evaluation, as the percentage reported by the engine.
///
/// Variants are ordered from least to most certain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Confidence {
    P73,
    P87,
    P95,
    P98,
    P99,
    /// Exact search.
    P100,
}

impl Confidence {
    pub const fn percent(self) -> u8 {
        match self {
            Confidence::P73 => 73,
            Confidence::P87 => 87,
            Confidence::P95 => 95,
            Confidence::P98 => 98,
            Confidence::P99 => 99,
            Confidence::P100 => 100,
        }
    }

    pub const fn is_exact(self) -> bool {
        matches!(self, Confidence::P100)
    }
}

impl TryFrom<u8> for Confidence {
    type Error = BookError;

    fn try_from(percent: u8) -> Result<Self> {
        match percent {
            73 => Ok(Confidence::P73),
            87 => Ok(Confidence::P87),
            95 => Ok(Confidence::P95),
            98 => Ok(Confidence::P98),
            99 => Ok(Confidence::P99),
            100 => Ok(Confidence::P100),
            other => Err(BookError::InvalidEvaluation(format!(
                "unknown confidence {other}%"
            ))),
        }
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> u8 {
        confidence.percent()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Key used to decide whether one evaluation of a position replaces another.
///
/// Depth decides first, then confidence; level only separates evaluations
/// that agree on both. The store applies the same key in SQL.
pub type SortKey = (u8, Confidence, Level);

/// The engine's verdict on one position.
///
/// Every value of this type has passed validation: fields are in range and
/// `best_moves` replays legally from `position`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EvaluationRecord", into = "EvaluationRecord")]
pub struct Evaluation {
    position: Position,
    level: Level,
    depth: u8,
    confidence: Confidence,
    score: i8,
    best_moves: Vec<Move>,
}

/// Unvalidated serde shape of [`Evaluation`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationRecord {
    position: Position,
    level: Level,
    depth: u8,
    confidence: Confidence,
    score: i8,
    best_moves: Vec<Move>,
}

impl TryFrom<EvaluationRecord> for Evaluation {
    type Error = BookError;

    fn try_from(record: EvaluationRecord) -> Result<Self> {
        Evaluation::new(
            record.position,
            record.level,
            record.depth,
            record.confidence,
            record.score,
            record.best_moves,
        )
    }
}

impl From<Evaluation> for EvaluationRecord {
    fn from(evaluation: Evaluation) -> Self {
        EvaluationRecord {
            position: evaluation.position,
            level: evaluation.level,
            depth: evaluation.depth,
            confidence: evaluation.confidence,
            score: evaluation.score,
            best_moves: evaluation.best_moves,
        }
    }
}

impl Evaluation {
    /// Creates a validated evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::InvalidEvaluation`] if the level is odd or above
    /// 60, the depth is above 60, the score is outside `[-64, 64]`, or the
    /// best moves do not replay legally from `position`.
    pub fn new(
        position: Position,
        level: Level,
        depth: u8,
        confidence: Confidence,
        score: i8,
        best_moves: Vec<Move>,
    ) -> Result<Evaluation> {
        if level > MAX_LEVEL || level % 2 != 0 {
            return Err(BookError::InvalidEvaluation(format!(
                "level {level} is not an even number in 0..={MAX_LEVEL}"
            )));
        }
        if depth > MAX_DEPTH {
            return Err(BookError::InvalidEvaluation(format!(
                "depth {depth} exceeds {MAX_DEPTH}"
            )));
        }
        if !(-MAX_SCORE..=MAX_SCORE).contains(&score) {
            return Err(BookError::InvalidEvaluation(format!(
                "score {score} outside [-{MAX_SCORE}, {MAX_SCORE}]"
            )));
        }
        position.apply_all(&best_moves).map_err(|e| {
            BookError::InvalidEvaluation(format!("best moves do not replay: {e}"))
        })?;

        Ok(Evaluation {
            position,
            level,
            depth,
            confidence,
            score,
            best_moves,
        })
    }

    /// Evaluation of a finished game, derived from the disc count alone.
    pub fn for_game_end(position: &Position) -> Evaluation {
        let empties = position.count_empties().min(MAX_DEPTH as u32);
        Evaluation {
            position: *position,
            level: round_up_to_even(empties),
            depth: empties as u8,
            confidence: Confidence::P100,
            score: position.final_score(),
            best_moves: Vec::new(),
        }
    }

    /// Turns the evaluation of a passed position into the evaluation of the
    /// position that had to pass.
    pub fn for_pass_parent(&self) -> Evaluation {
        let mut best_moves = Vec::with_capacity(self.best_moves.len() + 1);
        best_moves.push(Move::Pass);
        best_moves.extend_from_slice(&self.best_moves);
        Evaluation {
            position: self.position.pass(),
            level: self.level,
            depth: self.depth,
            confidence: self.confidence,
            score: -self.score,
            best_moves,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn score(&self) -> i8 {
        self.score
    }

    pub fn best_moves(&self) -> &[Move] {
        &self.best_moves
    }

    pub fn best_move(&self) -> Option<Move> {
        self.best_moves.first().copied()
    }

    pub fn sort_key(&self) -> SortKey {
        (self.depth, self.confidence, self.level)
    }

    /// Strictly better than `other` under [`SortKey`]. Equal keys are not better.
    pub fn is_better_than(&self, other: &Evaluation) -> bool {
        self.sort_key() > other.sort_key()
    }

    /// Worth persisting: searched at least at the minimum learn level, on a
    /// position that is itself savable.
    pub fn is_savable(&self) -> bool {
        self.level >= MIN_LEARN_LEVEL && is_savable_position(&self.position)
    }

    /// Maps the position and best moves through `symmetry`.
    pub fn rotated(&self, symmetry: Symmetry) -> Evaluation {
        Evaluation {
            position: rotate(&self.position, symmetry),
            best_moves: self
                .best_moves
                .iter()
                .map(|mv| rotate_move(*mv, symmetry))
                .collect(),
            ..self.clone()
        }
    }

    pub fn unrotated(&self, symmetry: Symmetry) -> Evaluation {
        self.rotated(symmetry.inverse())
    }

    /// Returns the same evaluation expressed on the canonical position.
    pub fn canonicalized(&self) -> Evaluation {
        let (_, symmetry) = canonicalize(&self.position);
        self.rotated(symmetry)
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} level {} depth {}@{} score {:+}",
            self.position, self.level, self.depth, self.confidence, self.score
        )?;
        if let Some(mv) = self.best_move() {
            write!(f, " best {mv}")?;
        }
        Ok(())
    }
}
