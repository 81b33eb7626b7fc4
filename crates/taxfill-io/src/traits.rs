use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use taxfill_common::{CellRange, CellValue, CoordError};

/// Contents of one cell as seen by a backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellData {
    pub value: Option<CellValue>,
    pub formula: Option<String>,
}

impl CellData {
    pub fn from_value<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: Some(value.into()),
            formula: None,
        }
    }

    pub fn from_formula(formula: impl Into<String>) -> Self {
        Self {
            value: None,
            formula: Some(formula.into()),
        }
    }

    /// True when the cell carries a formula, either as a typed formula or as
    /// text beginning with the formula marker.
    pub fn is_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(|f| !f.trim().is_empty())
            || self.value.as_ref().is_some_and(CellValue::is_formula_text)
    }

    /// Human-readable contents: the formula if any, otherwise the value.
    pub fn display_text(&self) -> String {
        match (&self.formula, &self.value) {
            (Some(f), _) if !f.is_empty() => {
                if f.starts_with('=') {
                    f.clone()
                } else {
                    format!("={f}")
                }
            }
            (_, Some(v)) => v.to_string(),
            _ => String::new(),
        }
    }
}

/// Rectangular merged block, 1-based and inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl MergedRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn to_range(&self) -> Result<CellRange, CoordError> {
        CellRange::from_bounds(self.start_row, self.start_col, self.end_row, self.end_col)
    }
}

impl From<CellRange> for MergedRange {
    fn from(range: CellRange) -> Self {
        Self {
            start_row: range.master().row(),
            start_col: range.master().col(),
            end_row: range.end().row(),
            end_col: range.end().col(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SheetData {
    pub cells: BTreeMap<(u32, u32), CellData>,
    pub merged_cells: Vec<MergedRange>,
}

/// Where a backend should persist its workbook.
pub enum SaveDestination<'a> {
    Path(&'a Path),
    /// Return the encoded workbook.
    Bytes,
}

pub trait SpreadsheetReader: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sheet names in workbook declaration order.
    fn sheet_names(&self) -> Result<Vec<String>, Self::Error>;

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn read_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellData>, Self::Error> {
        // Default: fallback to range read
        let mut range = self.read_range(sheet, (row, col), (row, col))?;
        Ok(range.remove(&(row, col)))
    }

    /// Non-empty cells inside the inclusive window, keyed row-major.
    fn read_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<BTreeMap<(u32, u32), CellData>, Self::Error>;

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error>;

    /// Merged ranges of a sheet in the order the workbook declares them.
    fn merged_cells(&mut self, sheet: &str) -> Result<Vec<MergedRange>, Self::Error> {
        Ok(self.read_sheet(sheet)?.merged_cells)
    }
}

pub trait SpreadsheetWriter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error>;

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error>;

    fn merge_cells(&mut self, sheet: &str, range: MergedRange) -> Result<(), Self::Error>;

    fn save_to(&mut self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>, Self::Error>;

    fn save_to_bytes(&mut self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.save_to(SaveDestination::Bytes)?.unwrap_or_default())
    }
}
