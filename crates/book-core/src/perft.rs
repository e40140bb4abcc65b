use crate::position::Position;

/// Counts leaf nodes of the game tree below `position`, `depth` plies deep.
///
/// A forced pass does not consume a ply, and a finished game counts as a
/// single leaf.
///
/// # Arguments
///
/// * `position` - Root of the walk.
/// * `depth` - Number of plies to expand. A depth of `1` counts the legal moves.
pub fn perft(position: &Position, depth: u32) -> u64 {
    if position.has_moves() {
        if depth <= 1 {
            return position.moves().count() as u64;
        }
        position
            .children()
            .map(|(_, child)| perft(&child, depth - 1))
            .sum()
    } else {
        let passed = position.pass();
        if passed.has_moves() {
            perft(&passed, depth)
        } else {
            1
        }
    }
}

/// Executes a perft run starting from the standard initial position.
pub fn perft_root(depth: u32) -> u64 {
    perft(&Position::start(), depth)
}
