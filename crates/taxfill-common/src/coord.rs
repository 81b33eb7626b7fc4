//! Cell coordinates in the 1-based A1 convention used by templates.
//!
//! `CellRef` is an absolute (row, column) position bounded by Excel's grid:
//! 1,048,576 rows × 16,384 columns. Parsing accepts `C2`, `$C$2` and lowercase
//! column letters; display always renders the canonical uppercase form.

use core::fmt;
use std::error::Error;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const ROW_MAX: u32 = 1 << 20;
pub const COL_MAX: u32 = 1 << 14;

/// Errors returned when constructing or parsing coordinates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordError {
    ZeroIndex,
    RowOverflow(u32),
    ColOverflow(u32),
    /// Input was not of the form `<letters><digits>`.
    Malformed(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::ZeroIndex => write!(f, "row and column indices must be 1-based (>= 1)"),
            CoordError::RowOverflow(row) => write!(f, "row {row} exceeds {ROW_MAX}"),
            CoordError::ColOverflow(col) => write!(f, "col {col} exceeds {COL_MAX}"),
            CoordError::Malformed(text) => write!(f, "`{text}` is not an A1 cell reference"),
        }
    }
}

impl Error for CoordError {}

/// Absolute, 1-based grid coordinate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    row: u32,
    col: u32,
}

impl CellRef {
    /// Construct a coordinate from 1-based indices.
    pub fn new(row: u32, col: u32) -> Result<Self, CoordError> {
        if row == 0 || col == 0 {
            return Err(CoordError::ZeroIndex);
        }
        if row > ROW_MAX {
            return Err(CoordError::RowOverflow(row));
        }
        if col > COL_MAX {
            return Err(CoordError::ColOverflow(col));
        }
        Ok(Self { row, col })
    }

    /// Parse an A1 reference such as `D2` or `$D$2`.
    pub fn parse_a1(text: &str) -> Result<Self, CoordError> {
        let malformed = || CoordError::Malformed(text.to_string());
        let trimmed = text.trim();
        let split = trimmed
            .char_indices()
            .find(|(_, ch)| ch.is_ascii_digit())
            .map(|(idx, _)| idx)
            .ok_or_else(malformed)?;
        let (letters, digits) = trimmed.split_at(split);
        let letters = letters.replace('$', "").to_ascii_uppercase();
        let col = letters_to_column(&letters).ok_or_else(malformed)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let row: u32 = digits.parse().map_err(|_| malformed())?;
        Self::new(row, col)
    }

    #[inline(always)]
    pub fn row(self) -> u32 {
        self.row
    }

    #[inline(always)]
    pub fn col(self) -> u32 {
        self.col
    }

    /// Shift by signed deltas, failing if the result leaves the grid.
    pub fn offset(self, drow: i64, dcol: i64) -> Result<Self, CoordError> {
        let row = self.row as i64 + drow;
        let col = self.col as i64 + dcol;
        if row < 1 || col < 1 {
            return Err(CoordError::ZeroIndex);
        }
        Self::new(row as u32, col as u32)
    }

    /// Same row, different column.
    pub fn with_col(self, col: u32) -> Result<Self, CoordError> {
        Self::new(self.row, col)
    }

    pub fn col_letters(self) -> String {
        column_to_letters(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s)
    }
}

impl TryFrom<(u32, u32)> for CellRef {
    type Error = CoordError;

    fn try_from(value: (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(value.0, value.1)
    }
}

impl From<CellRef> for (u32, u32) {
    fn from(cell: CellRef) -> Self {
        (cell.row, cell.col)
    }
}

impl Serialize for CellRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        CellRef::parse_a1(&text).map_err(serde::de::Error::custom)
    }
}

/// Convert a 1-based column index into letters (`1 -> A`, `28 -> AB`).
pub fn column_to_letters(col: u32) -> String {
    let mut buf = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        buf.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Convert uppercase column letters into a 1-based index.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?;
        col = col.checked_add((ch - b'A') as u32 + 1)?;
    }
    if col > COL_MAX { None } else { Some(col) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let cell = CellRef::parse_a1("D2").unwrap();
        assert_eq!((cell.row(), cell.col()), (2, 4));
        assert_eq!(cell.to_string(), "D2");

        let anchored: CellRef = "$ab$10".parse().unwrap();
        assert_eq!(anchored.to_string(), "AB10");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(CellRef::parse_a1("12"), Err(CoordError::Malformed(_))));
        assert!(matches!(CellRef::parse_a1("C"), Err(CoordError::Malformed(_))));
        assert!(matches!(CellRef::parse_a1("C2x"), Err(CoordError::Malformed(_))));
        assert_eq!(CellRef::parse_a1("C0"), Err(CoordError::ZeroIndex));
    }

    #[test]
    fn bounds_enforced() {
        assert!(CellRef::new(ROW_MAX, COL_MAX).is_ok());
        assert_eq!(
            CellRef::new(ROW_MAX + 1, 1),
            Err(CoordError::RowOverflow(ROW_MAX + 1))
        );
        assert_eq!(CellRef::parse_a1("XFE1"), Err(CoordError::Malformed("XFE1".into())));
    }

    #[test]
    fn column_letter_roundtrip() {
        for (col, letters) in [(1, "A"), (26, "Z"), (27, "AA"), (28, "AB"), (16_384, "XFD")] {
            assert_eq!(column_to_letters(col), letters);
            assert_eq!(letters_to_column(letters), Some(col));
        }
        assert!(letters_to_column("a").is_none());
    }

    #[test]
    fn offset_stays_on_grid() {
        let cell = CellRef::parse_a1("B3").unwrap();
        assert_eq!(cell.offset(0, 1).unwrap().to_string(), "C3");
        assert_eq!(cell.offset(0, -2), Err(CoordError::ZeroIndex));
    }

    #[test]
    fn serde_uses_a1_text() {
        let cell = CellRef::parse_a1("C6").unwrap();
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, "\"C6\"");
        let back: CellRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
    }
}
