use crate::IoError;
use crate::traits::{
    CellData, MergedRange, SaveDestination, SheetData, SpreadsheetReader, SpreadsheetWriter,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use taxfill_common::CellValue;

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    sheets: Vec<JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonSheet {
    name: String,
    #[serde(default)]
    cells: Vec<JsonCell>,
    #[serde(default)]
    merged_cells: Vec<MergedRange>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    row: u32,
    col: u32,
    #[serde(default)]
    value: Option<CellValue>,
    #[serde(default)]
    formula: Option<String>,
}

/// In-memory workbook with a JSON on-disk form.
///
/// Sheets keep their declaration order, which the engine relies on for
/// deterministic sheet matching.
pub struct JsonAdapter {
    sheets: Vec<(String, SheetData)>,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    fn from_workbook(wb: JsonWorkbook) -> Self {
        Self {
            sheets: wb
                .sheets
                .iter()
                .map(|js| (js.name.clone(), Self::to_sheet_data(js)))
                .collect(),
        }
    }

    fn to_sheet_data(js: &JsonSheet) -> SheetData {
        let mut cells: BTreeMap<(u32, u32), CellData> = BTreeMap::new();
        for c in &js.cells {
            cells.insert(
                (c.row, c.col),
                CellData {
                    value: c.value.clone(),
                    formula: c.formula.clone(),
                },
            );
        }
        SheetData {
            cells,
            merged_cells: js.merged_cells.clone(),
        }
    }

    fn from_sheet_data(name: &str, sd: &SheetData) -> JsonSheet {
        let cells = sd
            .cells
            .iter()
            .map(|(&(row, col), d)| JsonCell {
                row,
                col,
                value: d.value.clone(),
                formula: d.formula.clone(),
            })
            .collect();
        JsonSheet {
            name: name.to_string(),
            cells,
            merged_cells: sd.merged_cells.clone(),
        }
    }

    fn to_workbook(&self) -> JsonWorkbook {
        JsonWorkbook {
            version: default_version(),
            sheets: self
                .sheets
                .iter()
                .map(|(name, sd)| Self::from_sheet_data(name, sd))
                .collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(&self.to_workbook())?)
    }

    /// Borrow a sheet's contents.
    pub fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sd)| sd)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SheetData, IoError> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, sd)| sd)
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))
    }

    fn sheet_ref(&self, name: &str) -> Result<&SheetData, IoError> {
        self.sheet(name)
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))
    }

    /// Replace a sheet's merged ranges.
    pub fn set_merged_cells(&mut self, sheet: &str, merged: Vec<MergedRange>) -> Result<(), IoError> {
        self.sheet_mut(sheet)?.merged_cells = merged;
        Ok(())
    }

    fn write_json(&self, path: &Path) -> Result<(), IoError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

impl SpreadsheetReader for JsonAdapter {
    type Error = IoError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.sheets.iter().map(|(n, _)| n.clone()).collect())
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let text = fs::read_to_string(path.as_ref())?;
        let wb: JsonWorkbook = serde_json::from_str(&text)?;
        Ok(Self::from_workbook(wb))
    }

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let wb: JsonWorkbook = serde_json::from_slice(&data)?;
        Ok(Self::from_workbook(wb))
    }

    fn read_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellData>, Self::Error> {
        Ok(self.sheet_ref(sheet)?.cells.get(&(row, col)).cloned())
    }

    fn read_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<BTreeMap<(u32, u32), CellData>, Self::Error> {
        let sd = self.sheet_ref(sheet)?;
        if start.0 > end.0 || start.1 > end.1 {
            return Ok(BTreeMap::new());
        }
        Ok(sd
            .cells
            .range((start.0, 0)..=(end.0, u32::MAX))
            .filter(|((_, c), _)| *c >= start.1 && *c <= end.1)
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error> {
        Ok(self.sheet_ref(sheet)?.clone())
    }

    fn merged_cells(&mut self, sheet: &str) -> Result<Vec<MergedRange>, Self::Error> {
        Ok(self.sheet_ref(sheet)?.merged_cells.clone())
    }
}

impl SpreadsheetWriter for JsonAdapter {
    type Error = IoError;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error> {
        if row == 0 || col == 0 {
            return Err(IoError::InvalidCell {
                sheet: sheet.to_string(),
                row,
                col,
                message: "coordinates are 1-based".to_string(),
            });
        }
        let sd = self.sheet_mut(sheet)?;
        if data.value.is_none() && data.formula.is_none() {
            sd.cells.remove(&(row, col));
        } else {
            sd.cells.insert((row, col), data);
        }
        Ok(())
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        if self.sheet(name).is_none() {
            self.sheets.push((name.to_string(), SheetData::default()));
        }
        Ok(())
    }

    fn merge_cells(&mut self, sheet: &str, range: MergedRange) -> Result<(), Self::Error> {
        self.sheet_mut(sheet)?.merged_cells.push(range);
        Ok(())
    }

    fn save_to(&mut self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>, Self::Error> {
        match dest {
            SaveDestination::Path(p) => {
                self.write_json(p)?;
                Ok(None)
            }
            SaveDestination::Bytes => Ok(Some(self.to_json_string()?.into_bytes())),
        }
    }
}
