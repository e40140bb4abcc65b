//! The position model: two disjoint disc masks seen from the side to move.

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bitboard::Bitboard;
use crate::error::{BookError, Result};
use crate::flip::flip;
use crate::moves::Move;
use crate::square::{BOARD_SIZE, Square, TOTAL_SQUARES};

/// Length of the storage encoding: `me` then `opp`, little-endian.
pub const POSITION_BYTES: usize = 16;

/// Length of the hex wire encoding.
pub const POSITION_HEX_LEN: usize = 32;

/// A board position from the perspective of the side to move.
///
/// `me` holds the discs of the side to move and `opp` those of its opponent.
/// The masks never overlap. Ordering compares `me` first, then `opp`, which is
/// the order used to pick the canonical image of a position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    me: Bitboard,
    opp: Bitboard,
}

impl Default for Position {
    /// The standard starting position with black to move.
    fn default() -> Self {
        Position::start()
    }
}

impl Position {
    /// Creates a position from two disc masks.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::InvalidPosition`] if the masks overlap.
    pub fn new(me: impl Into<Bitboard>, opp: impl Into<Bitboard>) -> Result<Position> {
        let me = me.into();
        let opp = opp.into();
        if !(me & opp).is_empty() {
            return Err(BookError::InvalidPosition {
                me: me.bits(),
                opp: opp.bits(),
            });
        }
        Ok(Position { me, opp })
    }

    /// Creates a position from masks already known to be disjoint.
    #[inline]
    pub(crate) const fn from_disjoint(me: Bitboard, opp: Bitboard) -> Position {
        Position { me, opp }
    }

    /// The starting position: black (to move) on D5 and E4, white on D4 and E5.
    pub const fn start() -> Position {
        Position {
            me: Bitboard::new(Square::D5.bitboard() | Square::E4.bitboard()),
            opp: Bitboard::new(Square::D4.bitboard() | Square::E5.bitboard()),
        }
    }

    /// Parses a 64-character board string from A1 to H8.
    ///
    /// `X` marks a disc of the side to move, `O` a disc of the opponent and
    /// `-` or `.` an empty square. Whitespace is ignored.
    pub fn from_board_string(board: &str) -> Result<Position> {
        let mut me = 0u64;
        let mut opp = 0u64;
        let mut index = 0usize;

        for c in board.chars().filter(|c| !c.is_whitespace()) {
            if index >= TOTAL_SQUARES {
                return Err(BookError::Parse(format!(
                    "board string longer than {TOTAL_SQUARES} squares"
                )));
            }
            match c {
                'X' | 'x' | '*' => me |= 1 << index,
                'O' | 'o' => opp |= 1 << index,
                '-' | '.' => {}
                other => {
                    return Err(BookError::Parse(format!(
                        "unexpected character {other:?} in board string"
                    )));
                }
            }
            index += 1;
        }

        if index != TOTAL_SQUARES {
            return Err(BookError::Parse(format!(
                "board string has {index} squares, expected {TOTAL_SQUARES}"
            )));
        }
        Position::new(me, opp)
    }

    #[inline]
    pub const fn me(&self) -> Bitboard {
        self.me
    }

    #[inline]
    pub const fn opp(&self) -> Bitboard {
        self.opp
    }

    #[inline]
    pub fn empty(&self) -> Bitboard {
        !(self.me | self.opp)
    }

    /// Number of discs on the board.
    #[inline]
    pub const fn count_discs(&self) -> u32 {
        self.me.count() + self.opp.count()
    }

    #[inline]
    pub const fn count_empties(&self) -> u32 {
        TOTAL_SQUARES as u32 - self.count_discs()
    }

    /// Legal destination squares for the side to move.
    #[inline]
    pub fn moves(&self) -> Bitboard {
        self.me.get_moves(self.opp)
    }

    #[inline]
    pub fn has_moves(&self) -> bool {
        !self.moves().is_empty()
    }

    /// Returns the position with the sides swapped, without checking legality.
    #[inline]
    pub const fn pass(&self) -> Position {
        Position {
            me: self.opp,
            opp: self.me,
        }
    }

    /// Neither side can move.
    pub fn is_game_end(&self) -> bool {
        !self.has_moves() && !self.pass().has_moves()
    }

    /// The side to move has no move but the opponent does.
    pub fn is_pass_position(&self) -> bool {
        !self.has_moves() && self.pass().has_moves()
    }

    /// Final score from the side to move's perspective, with empties
    /// awarded to the winner.
    ///
    /// # Returns
    ///
    /// `64 - 2 * loser_discs` with the winner's sign, or 0 on a tie.
    pub fn final_score(&self) -> i8 {
        let me = self.me.count() as i8;
        let opp = self.opp.count() as i8;
        if me > opp {
            64 - 2 * opp
        } else if opp > me {
            -64 + 2 * me
        } else {
            0
        }
    }

    /// Plays a move.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::IllegalMove`] if the square is occupied, flips
    /// nothing, or if a pass is requested while a move is available.
    pub fn apply(&self, mv: Move) -> Result<Position> {
        match mv {
            Move::Pass => {
                if self.has_moves() {
                    return Err(BookError::IllegalMove { position: *self, mv });
                }
                Ok(self.pass())
            }
            Move::Play(sq) => {
                if !self.empty().contains(sq) {
                    return Err(BookError::IllegalMove { position: *self, mv });
                }
                let flipped = flip(sq, self.me.bits(), self.opp.bits());
                if flipped == 0 {
                    return Err(BookError::IllegalMove { position: *self, mv });
                }
                let me = self.me.bits() | flipped | sq.bitboard();
                let opp = self.opp.bits() & !flipped;
                Ok(Position {
                    me: Bitboard::new(opp),
                    opp: Bitboard::new(me),
                })
            }
        }
    }

    /// Replays a sequence of moves, failing on the first illegal one.
    pub fn apply_all<'a>(&self, moves: impl IntoIterator<Item = &'a Move>) -> Result<Position> {
        moves
            .into_iter()
            .try_fold(*self, |position, mv| position.apply(*mv))
    }

    /// Returns every position reachable with one legal move, paired with the move.
    pub fn children(&self) -> impl Iterator<Item = (Square, Position)> + '_ {
        self.moves().iter().map(move |sq| {
            let flipped = flip(sq, self.me.bits(), self.opp.bits());
            let me = self.me.bits() | flipped | sq.bitboard();
            let opp = self.opp.bits() & !flipped;
            (
                sq,
                Position {
                    me: Bitboard::new(opp),
                    opp: Bitboard::new(me),
                },
            )
        })
    }

    /// Storage encoding: 16 bytes, `me` then `opp`, little-endian.
    pub fn to_bytes(&self) -> [u8; POSITION_BYTES] {
        let mut bytes = [0u8; POSITION_BYTES];
        LittleEndian::write_u64(&mut bytes[..8], self.me.bits());
        LittleEndian::write_u64(&mut bytes[8..], self.opp.bits());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Position> {
        if bytes.len() != POSITION_BYTES {
            return Err(BookError::Parse(format!(
                "position blob has {} bytes, expected {POSITION_BYTES}",
                bytes.len()
            )));
        }
        Position::new(
            LittleEndian::read_u64(&bytes[..8]),
            LittleEndian::read_u64(&bytes[8..]),
        )
    }

    /// Board argument of the engine's `setboard` command.
    ///
    /// Eight ranks from rank 1 to rank 8 joined by `/`, each rank listing
    /// files A to H as `X` (side to move), `O` or `-`, followed by the turn
    /// character `X`. The result is always 72 characters long.
    pub fn to_setboard(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in 0..BOARD_SIZE {
            if rank > 0 {
                out.push('/');
            }
            for file in 0..BOARD_SIZE {
                let bit = 1u64 << (rank * BOARD_SIZE + file);
                out.push(self.square_char(bit));
            }
        }
        out.push('X');
        out
    }

    /// Renders the board as an 8x8 grid for logs.
    pub fn to_board_string(&self) -> String {
        let mut out = String::from("  a b c d e f g h\n");
        for rank in 0..BOARD_SIZE {
            out.push((b'1' + rank as u8) as char);
            for file in 0..BOARD_SIZE {
                let bit = 1u64 << (rank * BOARD_SIZE + file);
                out.push(' ');
                out.push(self.square_char(bit));
            }
            out.push('\n');
        }
        out
    }

    fn square_char(&self, bit: u64) -> char {
        if self.me.bits() & bit != 0 {
            'X'
        } else if self.opp.bits() & bit != 0 {
            'O'
        } else {
            '-'
        }
    }
}

impl fmt::Display for Position {
    /// Wire encoding: `me` then `opp`, each as 16 big-endian hex digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.me.bits(), self.opp.bits())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self})")
    }
}

impl FromStr for Position {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != POSITION_HEX_LEN || !s.is_ascii() {
            return Err(BookError::Parse(format!(
                "position must be {POSITION_HEX_LEN} hex characters, got {s:?}"
            )));
        }
        let parse = |part: &str| {
            u64::from_str_radix(part, 16)
                .map_err(|e| BookError::Parse(format!("invalid position hex {s:?}: {e}")))
        };
        Position::new(parse(&s[..16])?, parse(&s[16..])?)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
