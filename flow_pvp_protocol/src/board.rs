// Boards as they travel on the wire.
//
// A board is sent as a nested array of cell tokens. The server always emits
// integers, but the format historically allowed strings too, so a token is
// either a JSON number, a string, or anything else, and `normalize_board`
// turns every token into a cell value:
//
// - integers in 0..=255 are taken as-is, anything else is 0;
// - floats are truncated toward zero, then treated like integers;
// - strings are trimmed, then the leading run of ASCII digits (after an
//   optional `+`) is parsed; no digits, a `-` sign, or a value above 255
//   gives 0;
// - any other JSON value (null, bool, array, object) is 0.
//
// A token that maps to 0 silently becomes an empty cell. Board sources that
// rely on non-numeric tokens for some other purpose lose that data here.

use serde::{Deserialize, Serialize};

/// One cell of a wire board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellToken {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

/// A board in wire form.
pub type WireBoard = Vec<Vec<CellToken>>;

impl CellToken {
    /// The cell value this token denotes.
    pub fn value(&self) -> u8 {
        match self {
            CellToken::Int(v) => u8::try_from(*v).unwrap_or(0),
            CellToken::Float(f) if f.is_finite() => {
                let t = f.trunc();
                if (0.0..=255.0).contains(&t) { t as u8 } else { 0 }
            }
            CellToken::Float(_) | CellToken::Other(_) => 0,
            CellToken::Text(s) => parse_leading_digits(s),
        }
    }
}

fn parse_leading_digits(s: &str) -> u8 {
    let s = s.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits: &str = &s[..s.bytes().take_while(u8::is_ascii_digit).count()];
    if digits.is_empty() {
        return 0;
    }
    // Long digit runs overflow u64 too; either way the value is out of range.
    digits.parse::<u64>().ok().and_then(|v| u8::try_from(v).ok()).unwrap_or(0)
}

/// Encode a board for sending.
pub fn wire_board(rows: &[Vec<u8>]) -> WireBoard {
    rows.iter()
        .map(|row| row.iter().map(|&v| CellToken::Int(i64::from(v))).collect())
        .collect()
}

/// Decode a received board into cell values. Shape is preserved as sent;
/// squareness is checked when the rows are turned into a puzzle board.
pub fn normalize_board(board: &[Vec<CellToken>]) -> Vec<Vec<u8>> {
    board
        .iter()
        .map(|row| row.iter().map(CellToken::value).collect())
        .collect()
}
