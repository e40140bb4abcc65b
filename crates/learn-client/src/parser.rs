//! Parser for the engine's search table.
//!
//! With `post` enabled the engine prints one row per completed iteration:
//!
//! ```text
//!  depth|score|       time   |  nodes (N)  |   N/s    | principal variation
//! ------+-----+--------------+-------------+----------+---------------------
//!  9@73%  -51        0:00.001          6064    6064000 e8 H5 h8 C7 c6 C5 b8
//!    19   -60        0:00.003         52539   17513000 h8 H5 g8 C7 c6 B6 c5
//! ------+-----+--------------+-------------+----------+---------------------
//! ```
//!
//! The table ends at its second border; the last row before it is the result.

use book_core::Move;

use crate::error::EngineError;

pub const TABLE_BORDER: &str =
    "------+-----+--------------+-------------+----------+---------------------";

/// Column where the principal variation starts.
const PV_COLUMN: usize = 53;

/// One completed iteration of the search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchLine {
    pub depth: u8,
    pub confidence: u8,
    pub score: i8,
    pub best_moves: Vec<Move>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Blank lines, headers, board art and rows with a bounded score.
    Ignored,
    Border,
    Row(SearchLine),
}

/// Classifies one line of engine output.
///
/// # Errors
///
/// Returns [`EngineError::Output`] for a line that looks like a table row
/// but cannot be parsed.
pub fn parse_line(line: &str) -> Result<LineKind, EngineError> {
    let trimmed = line.trim_end();
    if trimmed.trim().is_empty() {
        return Ok(LineKind::Ignored);
    }
    if trimmed.contains(TABLE_BORDER) {
        return Ok(LineKind::Border);
    }
    if trimmed.contains("depth")
        || trimmed.contains("*** problem #")
        || trimmed.contains("A B C D E F G H")
        || is_board_art(trimmed)
    {
        return Ok(LineKind::Ignored);
    }

    let error = |reason: &str| EngineError::Output {
        line: trimmed.to_string(),
        reason: reason.to_string(),
    };

    let mut columns = trimmed.split_whitespace();
    let (Some(depth_column), Some(score_column)) = (columns.next(), columns.next()) else {
        return Err(error("not enough columns"));
    };

    // A bounded score comes from an aspiration window and is not final.
    if score_column.starts_with('<') || score_column.starts_with('>') {
        return Ok(LineKind::Ignored);
    }

    let (depth, confidence) = match depth_column.split_once('@') {
        Some((depth, confidence)) => (depth, confidence.trim_end_matches('%')),
        None => (depth_column, "100"),
    };
    let depth = depth.parse().map_err(|_| error("bad depth"))?;
    let confidence = confidence.parse().map_err(|_| error("bad confidence"))?;
    let score = score_column.parse().map_err(|_| error("bad score"))?;

    let best_moves = trimmed
        .get(PV_COLUMN..)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::parse::<Move>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| error("bad principal variation"))?;

    Ok(LineKind::Row(SearchLine {
        depth,
        confidence,
        score,
        best_moves,
    }))
}

/// Rows of the board diagram start with the rank digit, e.g. `4 O O * - ...`.
fn is_board_art(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_digit()
        && bytes[1] == b' '
        && matches!(bytes[2], b'O' | b'*' | b'-' | b'.' | b'X')
}

/// Accumulates rows of one search until the table is closed.
#[derive(Debug, Default)]
pub struct OutputParser {
    borders: usize,
    last: Option<SearchLine>,
}

impl OutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line.
    ///
    /// # Returns
    ///
    /// The last row once the closing border has been read, `None` before.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoResult`] if the table closes without rows,
    /// or the parse error of a malformed line inside the table. Lines before
    /// the table opens are skipped.
    pub fn feed(&mut self, line: &str) -> Result<Option<SearchLine>, EngineError> {
        let kind = match parse_line(line) {
            Ok(kind) => kind,
            Err(_) if self.borders == 0 => LineKind::Ignored,
            Err(err) => return Err(err),
        };
        match kind {
            LineKind::Ignored => Ok(None),
            LineKind::Row(row) => {
                self.last = Some(row);
                Ok(None)
            }
            LineKind::Border => {
                self.borders += 1;
                if self.borders < 2 {
                    return Ok(None);
                }
                self.last.take().map(Some).ok_or(EngineError::NoResult)
            }
        }
    }

    /// Latest row read so far.
    pub fn last(&self) -> Option<&SearchLine> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_core::Square;

    fn moves(squares: &[&str]) -> Vec<Move> {
        squares.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn row(line: &str) -> SearchLine {
        match parse_line(line).unwrap() {
            LineKind::Row(row) => row,
            other => panic!("expected a row, got {other:?}"),
        }
    }

    #[test]
    fn test_ignored_lines() {
        for line in [
            "*** problem # 1 ***\n",
            "\n",
            "  A B C D E F G H\n",
            "1 O O O O O O O O 1\n",
            "2 O O O O O O O O 2 * to move\n",
            "4 O O O O O O O O 4 *: discs =  7    moves =  5\n",
            "5 - - . O * O * - 5 O: discs = 38    moves =  6\n",
            "6 - - - * * * * O 6  empties = 19      ply = 42\n",
            "8 - - - - . . . . 8\n",
            " depth|score|       time   |  nodes (N)  |   N/s    | principal variation\n",
        ] {
            assert_eq!(parse_line(line).unwrap(), LineKind::Ignored, "{line:?}");
        }
    }

    #[test]
    fn test_border() {
        assert_eq!(parse_line(&format!("{TABLE_BORDER}\n")).unwrap(), LineKind::Border);
    }

    #[test]
    fn test_rows() {
        assert_eq!(
            row(" 0@73%  -44        0:00.000             7            f8                  \n"),
            SearchLine { depth: 0, confidence: 73, score: -44, best_moves: moves(&["f8"]) }
        );
        assert_eq!(
            row(" 5@73%  -59        0:00.000           210            f8 H5 c5            "),
            SearchLine { depth: 5, confidence: 73, score: -59, best_moves: moves(&["f8", "h5", "c5"]) }
        );
        assert_eq!(
            row(" 9@73%  -51        0:00.001          6064    6064000 e8 H5 h8 C7 c6 C5 b8\n").best_moves,
            moves(&["e8", "h5", "h8", "c7", "c6", "c5", "b8"])
        );
    }

    #[test]
    fn test_row_with_pass() {
        let row = row("19@73%  -60        0:00.003         24589    8196333 e8 H5 c5 B5 h8 C6 ps\n");
        assert_eq!(row.depth, 19);
        assert_eq!(row.score, -60);
        assert_eq!(row.best_moves.first(), Some(&Move::Play(Square::E8)));
        assert_eq!(row.best_moves.last(), Some(&Move::Pass));
        assert_eq!(row.best_moves.len(), 7);
    }

    #[test]
    fn test_exact_row() {
        let row = row("   19   -60        0:00.003           352     117333 h8 H5 g8 C7 c6 B6 c5\n");
        assert_eq!(row.confidence, 100);
        assert_eq!(row.best_moves[0], Move::Play(Square::H8));
    }

    #[test]
    fn test_bounded_scores_are_ignored() {
        for line in [
            "19@73% <-53        0:00.001         10657   10657000 e8 H5 h8 C7 c6 C5 b8\n",
            "   19  <-62        0:00.003         31405   10468333 e8 H5 c5 D8 h8 B5   \n",
        ] {
            assert_eq!(parse_line(line).unwrap(), LineKind::Ignored);
        }
    }

    #[test]
    fn test_malformed_row() {
        assert!(parse_line("19@xx%  -60   0:00.003").is_err());
        assert!(parse_line("garbage").is_err());
    }

    #[test]
    fn test_output_parser_finishes_at_second_border() {
        let mut parser = OutputParser::new();
        let output = [
            " depth|score|       time   |  nodes (N)  |   N/s    | principal variation",
            TABLE_BORDER,
            " 9@73%  -51        0:00.001          6064    6064000 e8 H5 h8 C7 c6 C5 b8",
            "19@73% <-53        0:00.001         10657   10657000 e8 H5 h8 C7 c6 C5 b8",
            "   19   -60        0:00.003         52539   17513000 h8 H5 g8 C7 c6 B6 c5",
        ];
        for line in output {
            assert_eq!(parser.feed(line).unwrap(), None);
        }
        assert_eq!(parser.last().map(|row| row.depth), Some(19));

        let result = parser.feed(TABLE_BORDER).unwrap().unwrap();
        assert_eq!(result.confidence, 100);
        assert_eq!(result.score, -60);
    }

    #[test]
    fn test_output_parser_skips_banner() {
        let mut parser = OutputParser::new();
        assert_eq!(parser.feed("Edax version 4.5.3").unwrap(), None);
        assert_eq!(parser.feed(TABLE_BORDER).unwrap(), None);
        assert!(parser.feed("Edax version 4.5.3").is_err());
    }

    #[test]
    fn test_output_parser_empty_table() {
        let mut parser = OutputParser::new();
        assert_eq!(parser.feed(TABLE_BORDER).unwrap(), None);
        assert!(matches!(parser.feed(TABLE_BORDER), Err(EngineError::NoResult)));
    }
}
