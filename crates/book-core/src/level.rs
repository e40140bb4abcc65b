//! Learn levels and the thresholds deciding what is worth persisting.

use crate::evaluation::{Confidence, SortKey};
use crate::position::Position;

/// Nominal search depth requested from the engine.
pub type Level = u8;

/// Evaluations below this level are not persisted.
pub const MIN_LEARN_LEVEL: Level = 16;

/// Positions with more discs than this are not persisted.
pub const MAX_SAVABLE_DISCS: u32 = 30;

/// Highest level an evaluation may carry.
pub const MAX_LEVEL: Level = 60;

/// Smallest disc count of a reachable position.
pub const MIN_DISCS: u32 = 4;

/// Returns the level the book aims for at a given disc count.
///
/// Early positions are searched deeper since they are reached by many games.
///
/// # Arguments
///
/// * `disc_count` - Number of discs on the board.
///
/// # Returns
///
/// An even search level.
pub const fn learn_level(disc_count: u32) -> Level {
    if disc_count <= 12 {
        36
    } else if disc_count <= 20 {
        34
    } else {
        32
    }
}

/// A position is savable when the side to move has a move and the board is
/// not past the disc limit. Pass and terminal positions are always derived.
pub fn is_savable_position(position: &Position) -> bool {
    position.has_moves() && position.count_discs() <= MAX_SAVABLE_DISCS
}

/// Weakest key a search at `level` returns for a position with `disc_count`
/// discs. Stored evaluations below it are worth searching again, and any
/// result of that search replaces them.
pub const fn search_floor(disc_count: u32, level: Level) -> SortKey {
    let empties = 64u32.saturating_sub(disc_count);
    let depth = if (level as u32) < empties { level } else { empties as u8 };
    (depth, Confidence::P73, level)
}

/// Rounds a depth up to the next even level.
pub const fn round_up_to_even(depth: u32) -> Level {
    let depth = if depth > MAX_LEVEL as u32 { MAX_LEVEL as u32 } else { depth };
    (depth + (depth & 1)) as Level
}
