//! Bitboard operations and types.
//!
//! This module provides a [`Bitboard`] type that represents a 64-square board
//! using a single `u64`, where each bit corresponds to a square (bit 0 = A1, bit 63 = H8).

use std::ops::{BitAnd, BitOr, Not};

use crate::square::Square;

/// Newtype wrapper for a 64-bit bitboard (bit 0 = A1, bit 63 = H8).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Bitboard(u64);

impl Bitboard {
    /// Creates a new bitboard from raw bits.
    #[inline(always)]
    pub const fn new(bits: u64) -> Self {
        Bitboard(bits)
    }

    /// Returns the raw 64-bit value.
    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Creates a bitboard with a single bit set at the given square.
    #[inline(always)]
    pub const fn from_square(sq: Square) -> Self {
        Bitboard(sq.bitboard())
    }

    /// Checks if the bitboard contains the bit at the given square.
    ///
    /// # Arguments
    ///
    /// * `sq` - The square to check.
    ///
    /// # Returns
    ///
    /// `true` if the specified square's bit is set, `false` otherwise.
    #[inline(always)]
    pub const fn contains(self, sq: Square) -> bool {
        self.0 & sq.bitboard() != 0
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of set bits (population count).
    #[inline(always)]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns a new bitboard with the least significant bit cleared.
    #[inline(always)]
    pub const fn clear_lsb(self) -> Self {
        Bitboard(self.0 & self.0.wrapping_sub(1))
    }

    /// Removes and returns the least significant set bit as a square,
    /// along with the updated bitboard.
    ///
    /// # Panics
    ///
    /// Panics if the bitboard is empty in debug mode.
    #[inline(always)]
    pub fn pop_lsb(self) -> (Square, Self) {
        debug_assert!(!self.is_empty(), "pop_lsb called on empty bitboard");
        (
            Square::from_u32_unchecked(self.0.trailing_zeros()),
            self.clear_lsb(),
        )
    }

    /// Flips the bitboard vertically (rank 1 ↔ rank 8).
    #[inline(always)]
    pub const fn flip_vertical(self) -> Self {
        Bitboard(self.0.swap_bytes())
    }

    /// Flips the bitboard horizontally (file A ↔ file H).
    #[inline(always)]
    pub const fn flip_horizontal(self) -> Self {
        const MASK1: u64 = 0x5555555555555555;
        const MASK2: u64 = 0x3333333333333333;
        const MASK3: u64 = 0x0f0f0f0f0f0f0f0f;

        let mut b = self.0;
        b = ((b >> 1) & MASK1) | ((b & MASK1) << 1);
        b = ((b >> 2) & MASK2) | ((b & MASK2) << 2);
        b = ((b >> 4) & MASK3) | ((b & MASK3) << 4);
        Bitboard(b)
    }

    /// Flips the bitboard along the A1-H8 diagonal (transpose).
    #[inline(always)]
    pub const fn flip_diag_a1h8(self) -> Self {
        const MASK1: u64 = 0x5500550055005500;
        const MASK2: u64 = 0x3333000033330000;
        const MASK3: u64 = 0x0f0f0f0f00000000;

        let mut bits = self.0;
        bits = delta_swap(bits, MASK3, 28);
        bits = delta_swap(bits, MASK2, 14);
        bits = delta_swap(bits, MASK1, 7);
        Bitboard(bits)
    }

    /// Returns an iterator over all set squares in LSB-first order.
    #[inline(always)]
    pub fn iter(self) -> BitboardIterator {
        BitboardIterator { bitboard: self }
    }

    /// Gets the legal moves for the player owning this bitboard.
    ///
    /// # Arguments
    ///
    /// * `opponent` - The opponent's bitboard.
    ///
    /// # Returns
    ///
    /// A `Bitboard` with bits set for each legal move position.
    #[inline(always)]
    pub fn get_moves(self, opponent: Bitboard) -> Bitboard {
        Bitboard(get_moves(self.0, opponent.0))
    }
}

impl BitAnd for Bitboard {
    type Output = Bitboard;

    #[inline(always)]
    fn bitand(self, rhs: Bitboard) -> Bitboard {
        Bitboard(self.0 & rhs.0)
    }
}

impl BitOr for Bitboard {
    type Output = Bitboard;

    #[inline(always)]
    fn bitor(self, rhs: Bitboard) -> Bitboard {
        Bitboard(self.0 | rhs.0)
    }
}

impl Not for Bitboard {
    type Output = Bitboard;

    #[inline(always)]
    fn not(self) -> Bitboard {
        Bitboard(!self.0)
    }
}

impl From<u64> for Bitboard {
    #[inline(always)]
    fn from(bits: u64) -> Self {
        Bitboard(bits)
    }
}

impl From<Bitboard> for u64 {
    #[inline(always)]
    fn from(bitboard: Bitboard) -> Self {
        bitboard.0
    }
}

impl IntoIterator for Bitboard {
    type Item = Square;
    type IntoIter = BitboardIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Computes the legal moves for `player` against `opponent`.
///
/// Opponent runs are propagated along the four axes; each axis masks the
/// board edges it would otherwise wrap around.
#[inline(always)]
pub fn get_moves(player: u64, opponent: u64) -> u64 {
    let empty = !(player | opponent);
    (get_some_moves(player, opponent & 0x007E7E7E7E7E7E00, 7) & empty)
        | (get_some_moves(player, opponent & 0x007E7E7E7E7E7E00, 9) & empty)
        | (get_some_moves(player, opponent & 0x7E7E7E7E7E7E7E7E, 1) & empty)
        | (get_some_moves(player, opponent & 0x00FFFFFFFFFFFF00, 8) & empty)
}

/// Propagates opponent runs in both senses of a direction.
///
/// # Arguments
///
/// * `b` - The player's bitboard.
/// * `mask` - The opponent's discs with edge masking for the direction.
/// * `dir` - The direction (in bits).
#[inline(always)]
fn get_some_moves(b: u64, mask: u64, dir: u32) -> u64 {
    let mut flip = ((b << dir) | (b >> dir)) & mask;
    flip |= ((flip << dir) | (flip >> dir)) & mask;
    flip |= ((flip << dir) | (flip >> dir)) & mask;
    flip |= ((flip << dir) | (flip >> dir)) & mask;
    flip |= ((flip << dir) | (flip >> dir)) & mask;
    flip |= ((flip << dir) | (flip >> dir)) & mask;
    (flip << dir) | (flip >> dir)
}

/// Swaps bit pairs that are `delta` apart wherever `mask` has its high bit.
#[inline(always)]
const fn delta_swap(bits: u64, mask: u64, delta: u32) -> u64 {
    let tmp = mask & (bits ^ (bits << delta));
    bits ^ tmp ^ (tmp >> delta)
}

/// An iterator that yields each set bit position in a bitboard as a `Square`.
pub struct BitboardIterator {
    bitboard: Bitboard,
}

impl Iterator for BitboardIterator {
    type Item = Square;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.bitboard.is_empty() {
            return None;
        }

        let (square, rest) = self.bitboard.pop_lsb();
        self.bitboard = rest;
        Some(square)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bitboard.count() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitboardIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_swap() {
        // Swapping bit 0 and bit 1.
        assert_eq!(delta_swap(0b01, 0b10, 1), 0b10);
        assert_eq!(delta_swap(0b10, 0b10, 1), 0b01);
        assert_eq!(delta_swap(0b11, 0b10, 1), 0b11);
    }

    #[test]
    fn test_flip_vertical() {
        let b = Bitboard::from_square(Square::A1);
        assert_eq!(b.flip_vertical(), Bitboard::from_square(Square::A8));
        let b = Bitboard::from_square(Square::C3);
        assert_eq!(b.flip_vertical(), Bitboard::from_square(Square::C6));
    }

    #[test]
    fn test_flip_horizontal() {
        let b = Bitboard::from_square(Square::A1);
        assert_eq!(b.flip_horizontal(), Bitboard::from_square(Square::H1));
        let b = Bitboard::from_square(Square::C3);
        assert_eq!(b.flip_horizontal(), Bitboard::from_square(Square::F3));
    }

    #[test]
    fn test_flip_diag_a1h8() {
        let b = Bitboard::from_square(Square::B1);
        assert_eq!(b.flip_diag_a1h8(), Bitboard::from_square(Square::A2));
        let b = Bitboard::from_square(Square::H1);
        assert_eq!(b.flip_diag_a1h8(), Bitboard::from_square(Square::A8));
        let b = Bitboard::from_square(Square::D4);
        assert_eq!(b.flip_diag_a1h8(), b);
    }

    #[test]
    fn test_flips_are_involutions() {
        let b = Bitboard::new(0x0123_4567_89ab_cdef);
        assert_eq!(b.flip_vertical().flip_vertical(), b);
        assert_eq!(b.flip_horizontal().flip_horizontal(), b);
        assert_eq!(b.flip_diag_a1h8().flip_diag_a1h8(), b);
        assert_eq!(b.flip_diag_a1h8().count(), b.count());
    }

    #[test]
    fn test_get_moves_initial_position() {
        let player = Bitboard::from_square(Square::D5) | Bitboard::from_square(Square::E4);
        let opponent = Bitboard::from_square(Square::D4) | Bitboard::from_square(Square::E5);
        let moves = player.get_moves(opponent);
        let expected: Vec<Square> = vec![Square::D3, Square::C4, Square::F5, Square::E6];
        let mut got: Vec<Square> = moves.iter().collect();
        got.sort();
        let mut expected = expected;
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_get_moves_no_wraparound() {
        // Opponent on H1 with player on A2 must not produce a move at G1 via wrap.
        let player = Bitboard::from_square(Square::A2);
        let opponent = Bitboard::from_square(Square::H1);
        assert!(player.get_moves(opponent).is_empty());
    }

    #[test]
    fn test_iterator() {
        let b = Bitboard::from_square(Square::A1)
            | Bitboard::from_square(Square::C1)
            | Bitboard::from_square(Square::H8);
        let squares: Vec<Square> = b.iter().collect();
        assert_eq!(squares, vec![Square::A1, Square::C1, Square::H8]);
        assert_eq!(b.iter().len(), 3);
    }
}
