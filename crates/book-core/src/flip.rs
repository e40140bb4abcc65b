//! Disc flip calculation for move execution.

use crate::square::{BOARD_SIZE, Square};

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Calculates which opponent discs would be flipped by placing a disc at the given square.
///
/// # Arguments
///
/// * `sq` - The square where the disc is being placed
/// * `p` - Bitboard representing the current player's discs
/// * `o` - Bitboard representing the opponent's discs
///
/// # Returns
///
/// A bitboard representing all opponent discs that would be flipped by this move.
/// Returns 0 if no discs would be flipped (invalid move).
pub fn flip(sq: Square, p: u64, o: u64) -> u64 {
    let mut flipped = 0;

    for (dx, dy) in DIRECTIONS {
        let mut run = 0u64;
        let mut file = sq.file() as isize + dx;
        let mut rank = sq.rank() as isize + dy;

        while (0..BOARD_SIZE as isize).contains(&file) && (0..BOARD_SIZE as isize).contains(&rank)
        {
            let bit = 1u64 << (rank * BOARD_SIZE as isize + file);
            if o & bit != 0 {
                run |= bit;
            } else {
                if p & bit != 0 {
                    flipped |= run;
                }
                break;
            }
            file += dx;
            rank += dy;
        }
    }

    flipped
}
