//! Board symmetries and canonical positions.
//!
//! A symmetry index `r` in `0..8` is a bit set: bit 0 flips horizontally,
//! bit 1 flips vertically and bit 2 transposes along the A1-H8 diagonal,
//! applied in that order. Together they form the 8 elements of the
//! dihedral group of the square.

use std::fmt;

use crate::bitboard::Bitboard;
use crate::moves::Move;
use crate::position::Position;
use crate::square::Square;

pub const SYMMETRY_COUNT: u8 = 8;

/// Inverse of each symmetry index: a horizontal or vertical flip combined
/// with a transpose inverts to the other flip combined with a transpose.
const INVERSE: [u8; SYMMETRY_COUNT as usize] = [0, 1, 2, 3, 4, 6, 5, 7];

/// One of the 8 board symmetries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Symmetry(u8);

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry(0);

    /// # Returns
    ///
    /// `None` if `index` is not in `0..8`.
    pub const fn new(index: u8) -> Option<Symmetry> {
        if index < SYMMETRY_COUNT {
            Some(Symmetry(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Symmetry> {
        (0..SYMMETRY_COUNT).map(Symmetry)
    }

    pub const fn inverse(self) -> Symmetry {
        Symmetry(INVERSE[self.0 as usize])
    }

    /// Maps a bitboard through this symmetry.
    #[inline]
    pub const fn apply(self, bitboard: Bitboard) -> Bitboard {
        let mut b = bitboard;
        if self.0 & 1 != 0 {
            b = b.flip_horizontal();
        }
        if self.0 & 2 != 0 {
            b = b.flip_vertical();
        }
        if self.0 & 4 != 0 {
            b = b.flip_diag_a1h8();
        }
        b
    }

    #[inline]
    pub fn apply_square(self, sq: Square) -> Square {
        let bits = self.apply(Bitboard::from_square(sq)).bits();
        Square::from_u32_unchecked(bits.trailing_zeros())
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a position through a symmetry.
pub fn rotate(position: &Position, symmetry: Symmetry) -> Position {
    Position::from_disjoint(symmetry.apply(position.me()), symmetry.apply(position.opp()))
}

/// Maps a position that was rotated by `symmetry` back to its original orientation.
pub fn unrotate(position: &Position, symmetry: Symmetry) -> Position {
    rotate(position, symmetry.inverse())
}

/// Maps a move from the original orientation into the orientation given by `symmetry`.
pub fn rotate_move(mv: Move, symmetry: Symmetry) -> Move {
    match mv {
        Move::Play(sq) => Move::Play(symmetry.apply_square(sq)),
        Move::Pass => Move::Pass,
    }
}

/// Maps a move found in the rotated orientation back to the original orientation.
pub fn unrotate_move(mv: Move, symmetry: Symmetry) -> Move {
    rotate_move(mv, symmetry.inverse())
}

/// Returns the canonical image of `position` and the symmetry that produces it.
///
/// The canonical image is the lexicographically smallest `(me, opp)` pair over
/// all 8 symmetries. When several symmetries produce it, the lowest index wins.
pub fn canonicalize(position: &Position) -> (Position, Symmetry) {
    let mut best = *position;
    let mut best_symmetry = Symmetry::IDENTITY;

    for symmetry in Symmetry::all().skip(1) {
        let candidate = rotate(position, symmetry);
        if candidate < best {
            best = candidate;
            best_symmetry = symmetry;
        }
    }

    (best, best_symmetry)
}

/// Shorthand for the canonical image alone.
pub fn canonical(position: &Position) -> Position {
    canonicalize(position).0
}

pub fn is_canonical(position: &Position) -> bool {
    canonical(position) == *position
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_table() {
        let bitboard = Bitboard::new(0x0000_0000_0000_0f0e);
        for symmetry in Symmetry::all() {
            let back = symmetry.inverse().apply(symmetry.apply(bitboard));
            assert_eq!(back, bitboard, "symmetry {symmetry}");
        }
    }

    #[test]
    fn test_symmetry_images_are_distinct() {
        // C1 has no symmetry of its own, so its 8 images are all different squares.
        let mut images: Vec<Square> = Symmetry::all()
            .map(|s| s.apply_square(Square::C1))
            .collect();
        images.sort();
        images.dedup();
        assert_eq!(images.len(), 8);
    }

    #[test]
    fn test_apply_square() {
        assert_eq!(Symmetry(1).apply_square(Square::A1), Square::H1);
        assert_eq!(Symmetry(2).apply_square(Square::A1), Square::A8);
        assert_eq!(Symmetry(3).apply_square(Square::A1), Square::H8);
        assert_eq!(Symmetry(4).apply_square(Square::B1), Square::A2);
        // Horizontal flip then transpose: B1 -> G1 -> A7.
        assert_eq!(Symmetry(5).apply_square(Square::B1), Square::A7);
    }

    #[test]
    fn test_rotated_images_share_canonical_form() {
        let start = Position::start();
        let (canonical, _) = canonicalize(&start);
        for symmetry in Symmetry::all() {
            assert_eq!(canonicalize(&rotate(&start, symmetry)).0, canonical);
        }
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let position = Position::start()
            .apply(Move::Play(Square::F5))
            .unwrap()
            .apply(Move::Play(Square::D6))
            .unwrap();
        let (canonical, symmetry) = canonicalize(&position);
        assert!(is_canonical(&canonical));
        assert_eq!(canonicalize(&canonical), (canonical, Symmetry::IDENTITY));
        assert_eq!(unrotate(&canonical, symmetry), position);
    }

    #[test]
    fn test_opening_moves_share_canonical_form() {
        let start = Position::start();
        let children: Vec<Position> = start.children().map(|(_, child)| canonical(&child)).collect();
        assert!(children.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_rotate_move_round_trip() {
        for symmetry in Symmetry::all() {
            for sq in Square::iter() {
                let mv = Move::Play(sq);
                assert_eq!(unrotate_move(rotate_move(mv, symmetry), symmetry), mv);
            }
            assert_eq!(rotate_move(Move::Pass, symmetry), Move::Pass);
        }
    }
}
