use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coord::{CellRef, CoordError};

/// Inclusive rectangular block of cells, e.g. `C2:D2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    start: CellRef,
    end: CellRef,
}

impl CellRange {
    /// Build from two corners, normalising so `start` is the top-left.
    pub fn new(a: CellRef, b: CellRef) -> Self {
        let start = CellRef::new(a.row().min(b.row()), a.col().min(b.col()))
            .unwrap_or(a);
        let end = CellRef::new(a.row().max(b.row()), a.col().max(b.col()))
            .unwrap_or(b);
        Self { start, end }
    }

    /// Build from 1-based bounds.
    pub fn from_bounds(
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, CoordError> {
        Ok(Self::new(
            CellRef::new(start_row, start_col)?,
            CellRef::new(end_row, end_col)?,
        ))
    }

    /// Parse `C2:D2` (or a lone `C2`, which yields a 1×1 range).
    pub fn parse_a1(text: &str) -> Result<Self, CoordError> {
        match text.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellRef::parse_a1(a)?, CellRef::parse_a1(b)?)),
            None => {
                let cell = CellRef::parse_a1(text)?;
                Ok(Self::new(cell, cell))
            }
        }
    }

    /// Top-left cell: the only writable member of a merged block.
    #[inline]
    pub fn master(&self) -> CellRef {
        self.start
    }

    #[inline]
    pub fn end(&self) -> CellRef {
        self.end
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row() >= self.start.row()
            && cell.row() <= self.end.row()
            && cell.col() >= self.start.col()
            && cell.col() <= self.end.col()
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start.row() <= other.end.row()
            && other.start.row() <= self.end.row()
            && self.start.col() <= other.end.col()
            && other.start.col() <= self.end.col()
    }

    pub fn width(&self) -> u32 {
        self.end.col() - self.start.col() + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row() - self.start.row() + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for CellRange {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s)
    }
}

impl Serialize for CellRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        CellRange::parse_a1(&text).map_err(serde::de::Error::custom)
    }
}
