use std::fmt;
use std::str::FromStr;

use crate::error::BookError;

/// A square on the board, ranging from A1 to H8.
///
/// Squares are indexed row by row, so the index is also the bit position of
/// the square inside a [`Bitboard`](crate::bitboard::Bitboard):
///
/// ```text
///   A  B  C  D  E  F  G  H
/// 1 00 01 02 03 04 05 06 07
/// 2 08 09 10 11 12 13 14 15
/// 3 16 17 18 19 20 21 22 23
/// 4 24 25 26 27 28 29 30 31
/// 5 32 33 34 35 36 37 38 39
/// 6 40 41 42 43 44 45 46 47
/// 7 48 49 50 51 52 53 54 55
/// 8 56 57 58 59 60 61 62 63
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

pub const BOARD_SIZE: usize = 8;
pub const TOTAL_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

impl Square {
    /// Returns a `u64` with only this square's bit set.
    #[inline]
    pub const fn bitboard(self) -> u64 {
        1 << self as u8
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts an index into a square.
    ///
    /// # Arguments
    ///
    /// * `index` - Square index (0-63).
    ///
    /// # Returns
    ///
    /// `Some(Square)` if the index is on the board, `None` otherwise.
    #[inline]
    pub fn from_u8(index: u8) -> Option<Square> {
        if (index as usize) < TOTAL_SQUARES {
            // SAFETY: `Square` is `repr(u8)` with 64 contiguous variants starting at 0.
            Some(unsafe { std::mem::transmute::<u8, Square>(index) })
        } else {
            None
        }
    }

    /// Converts a bit index produced by `trailing_zeros` into a square.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `index` >= 64.
    #[inline]
    pub(crate) fn from_u32_unchecked(index: u32) -> Square {
        debug_assert!(index < 64, "Index out of bounds for Square enum. index: {index}");
        // SAFETY: callers pass the index of a set bit of a u64.
        unsafe { std::mem::transmute::<u8, Square>(index as u8) }
    }

    /// Returns the file (column) of this square, 0 for A through 7 for H.
    #[inline]
    pub const fn file(self) -> usize {
        self.index() % BOARD_SIZE
    }

    /// Returns the rank (row) of this square, 0 for rank 1 through 7 for rank 8.
    #[inline]
    pub const fn rank(self) -> usize {
        self.index() / BOARD_SIZE
    }

    /// Creates a square from file and rank indices.
    ///
    /// # Arguments
    ///
    /// * `file` - File index (0-7).
    /// * `rank` - Rank index (0-7).
    ///
    /// # Returns
    ///
    /// `None` if either coordinate is off the board.
    #[inline]
    pub fn from_file_rank(file: usize, rank: usize) -> Option<Square> {
        if file < BOARD_SIZE && rank < BOARD_SIZE {
            Square::from_u8((rank * BOARD_SIZE + file) as u8)
        } else {
            None
        }
    }

    /// Iterates over all 64 squares from A1 to H8.
    pub fn iter() -> impl Iterator<Item = Square> {
        (0..TOTAL_SQUARES as u8).filter_map(Square::from_u8)
    }
}

impl FromStr for Square {
    type Err = BookError;

    /// Parses algebraic notation such as `"f5"`. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(BookError::Parse(format!("invalid square: {s:?}")));
        }

        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(BookError::Parse(format!("invalid square: {s:?}")));
        }

        Square::from_file_rank((file - b'a') as usize, (rank - b'1') as usize)
            .ok_or_else(|| BookError::Parse(format!("invalid square: {s:?}")))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.file() as u8) as char;
        let rank = (b'1' + self.rank() as u8) as char;
        write!(f, "{file}{rank}")
    }
}
