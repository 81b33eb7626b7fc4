#![cfg(feature = "umya")]

use crate::traits::{
    CellData, MergedRange, SaveDestination, SheetData, SpreadsheetReader, SpreadsheetWriter,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use taxfill_common::{CellRange, CellValue, date_to_serial};
use umya_spreadsheet::{CellRawValue, CellValue as UmyaCellValue, Spreadsheet, reader::xlsx};

const DATE_FORMAT_CODE: &str = "dd/mm/yyyy";

/// xlsx/xlsm workbook held in memory by `umya-spreadsheet`.
///
/// Only cell values, formulas and merge metadata pass through this adapter;
/// macro parts and styles stay inside the `Spreadsheet` and are written back
/// as they were read.
pub struct UmyaAdapter {
    workbook: RwLock<Spreadsheet>,
}

impl UmyaAdapter {
    /// Wrap an already-loaded spreadsheet.
    pub fn from_spreadsheet(spreadsheet: Spreadsheet) -> Self {
        Self {
            workbook: RwLock::new(spreadsheet),
        }
    }

    /// Consume the adapter and hand back the spreadsheet.
    pub fn into_spreadsheet(self) -> Spreadsheet {
        self.workbook.into_inner()
    }

    fn convert_cell_value(cv: &UmyaCellValue) -> Option<CellValue> {
        let raw = cv.get_raw_value();
        if raw.is_empty() {
            return None;
        }
        if raw.is_error() {
            return Some(CellValue::Text(cv.get_value().to_string()));
        }
        match raw {
            CellRawValue::Numeric(n) => Some(
                Decimal::try_from(*n)
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::Text(n.to_string())),
            ),
            CellRawValue::Bool(b) => Some(CellValue::Boolean(*b)),
            CellRawValue::String(s) => Some(CellValue::Text(s.to_string())),
            CellRawValue::RichText(rt) => Some(CellValue::Text(rt.get_text().to_string())),
            CellRawValue::Lazy(s) => {
                let txt = s.as_ref();
                if let Ok(n) = txt.parse::<Decimal>() {
                    Some(CellValue::Number(n))
                } else if txt.eq_ignore_ascii_case("TRUE") {
                    Some(CellValue::Boolean(true))
                } else if txt.eq_ignore_ascii_case("FALSE") {
                    Some(CellValue::Boolean(false))
                } else {
                    Some(CellValue::Text(txt.to_string()))
                }
            }
            CellRawValue::Error(_) => Some(CellValue::Text(cv.get_value().to_string())),
            CellRawValue::Empty => None,
        }
    }

    fn missing_sheet(sheet: &str) -> umya_spreadsheet::XlsxError {
        umya_spreadsheet::XlsxError::CellError(format!("sheet `{sheet}` not found"))
    }

    /// Deserialize a named sheet, refusing names the workbook does not have.
    /// umya panics when asked to read a sheet that is absent.
    fn load_sheet(wb: &mut Spreadsheet, sheet: &str) -> Result<(), umya_spreadsheet::XlsxError> {
        if wb.get_sheet_by_name(sheet).is_none() {
            return Err(Self::missing_sheet(sheet));
        }
        wb.read_sheet_by_name(sheet);
        Ok(())
    }

    fn deserialize_all(wb: &mut Spreadsheet) {
        let count = wb.get_sheet_count();
        for i in 0..count {
            wb.read_sheet(i);
        }
    }
}

impl SpreadsheetReader for UmyaAdapter {
    type Error = umya_spreadsheet::XlsxError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        // Need write lock to deserialize sheets lazily
        let mut wb = self.workbook.write();
        let count = wb.get_sheet_count();
        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            wb.read_sheet(i);
            if let Some(s) = wb.get_sheet(&i) {
                names.push(s.get_name().to_string());
            }
        }
        Ok(names)
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        // Full read (not lazy) so that save operations don't hit deserialization assertions
        let sheet = xlsx::read(path.as_ref())?;
        Ok(Self::from_spreadsheet(sheet))
    }

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let sheet = xlsx::read_reader(Cursor::new(data), true)?;
        Ok(Self::from_spreadsheet(sheet))
    }

    fn read_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Result<Option<CellData>, Self::Error> {
        let mut wb = self.workbook.write();
        Self::load_sheet(&mut wb, sheet)?;
        let ws = wb
            .get_sheet_by_name(sheet)
            .ok_or_else(|| Self::missing_sheet(sheet))?;
        let Some(cell) = ws.get_cell((col, row)) else {
            return Ok(None);
        };
        let cv = cell.get_cell_value();
        let formula = if cv.is_formula() && !cv.get_formula().is_empty() {
            Some(format!("={}", cv.get_formula().trim_start_matches('=')))
        } else {
            None
        };
        let value = Self::convert_cell_value(cv);
        if value.is_none() && formula.is_none() {
            return Ok(None);
        }
        Ok(Some(CellData { value, formula }))
    }

    fn read_range(
        &mut self,
        sheet: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Result<BTreeMap<(u32, u32), CellData>, Self::Error> {
        // Fallback: read whole sheet then filter
        let data = self.read_sheet(sheet)?;
        Ok(data
            .cells
            .into_iter()
            .filter(|((r, c), _)| *r >= start.0 && *r <= end.0 && *c >= start.1 && *c <= end.1)
            .collect())
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error> {
        let mut wb = self.workbook.write();
        Self::load_sheet(&mut wb, sheet)?;
        let ws = wb
            .get_sheet_by_name(sheet)
            .ok_or_else(|| Self::missing_sheet(sheet))?;
        let mut cells_map: BTreeMap<(u32, u32), CellData> = BTreeMap::new();
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            let col = *coord.get_col_num();
            let row = *coord.get_row_num();
            let cv = cell.get_cell_value();
            let formula = if cv.is_formula() {
                let f = cv.get_formula();
                if f.is_empty() {
                    None
                } else {
                    Some(if f.starts_with('=') {
                        f.to_string()
                    } else {
                        format!("={}", f)
                    })
                }
            } else {
                None
            };
            let value = Self::convert_cell_value(cv);
            if value.is_none() && formula.is_none() {
                continue;
            }
            cells_map.insert((row, col), CellData { value, formula });
        }
        let merged_cells = ws
            .get_merge_cells()
            .iter()
            .filter_map(|range| match CellRange::parse_a1(&range.get_range()) {
                Ok(parsed) => Some(MergedRange::from(parsed)),
                Err(err) => {
                    tracing::warn!(sheet, range = %range.get_range(), %err, "skipping unreadable merged range");
                    None
                }
            })
            .collect();
        Ok(SheetData {
            cells: cells_map,
            merged_cells,
        })
    }
}

impl SpreadsheetWriter for UmyaAdapter {
    type Error = umya_spreadsheet::XlsxError;

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error> {
        let mut wb = self.workbook.write();
        Self::load_sheet(&mut wb, sheet)?;
        // Templates are never extended with new sheets by a write.
        let ws = wb
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| Self::missing_sheet(sheet))?;
        // umya uses (col,row)
        let cell = ws.get_cell_mut((col, row));
        match data.value {
            Some(CellValue::Number(n)) => {
                cell.set_value_number(n.to_f64().unwrap_or_default());
            }
            Some(CellValue::Date(d)) => {
                cell.set_value_number(date_to_serial(d) as f64);
                cell.get_style_mut()
                    .get_number_format_mut()
                    .set_format_code(DATE_FORMAT_CODE);
            }
            Some(CellValue::Text(s)) => {
                cell.set_value_string(s);
            }
            Some(CellValue::Boolean(b)) => {
                cell.set_value_bool(b);
            }
            Some(CellValue::Empty) | None => {
                cell.set_blank();
            }
        }
        if let Some(f) = data.formula {
            cell.set_formula(f.trim_start_matches('='));
        }
        Ok(())
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        let mut wb = self.workbook.write();
        if wb.get_sheet_by_name(name).is_none() {
            wb.new_sheet(name)
                .map_err(|e| umya_spreadsheet::XlsxError::CellError(e.to_string()))?;
        }
        Ok(())
    }

    fn merge_cells(&mut self, sheet: &str, range: MergedRange) -> Result<(), Self::Error> {
        let a1 = range
            .to_range()
            .map_err(|e| umya_spreadsheet::XlsxError::CellError(e.to_string()))?
            .to_string();
        let mut wb = self.workbook.write();
        Self::load_sheet(&mut wb, sheet)?;
        let ws = wb
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| Self::missing_sheet(sheet))?;
        ws.add_merge_cells(a1);
        Ok(())
    }

    fn save_to(&mut self, dest: SaveDestination<'_>) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut wb = self.workbook.write();
        Self::deserialize_all(&mut wb);
        match dest {
            SaveDestination::Path(p) => {
                umya_spreadsheet::writer::xlsx::write(&*wb, p)?;
                Ok(None)
            }
            SaveDestination::Bytes => {
                let mut buf = Cursor::new(Vec::new());
                umya_spreadsheet::writer::xlsx::write_writer(&*wb, &mut buf)?;
                Ok(Some(buf.into_inner()))
            }
        }
    }
}
