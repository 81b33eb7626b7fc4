use std::fmt;

use serde::Serialize;
use taxfill_common::{CellRange, CellRef};
use taxfill_io::SpreadsheetReader;

use crate::merge::MergeIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewCell {
    pub cell: CellRef,
    /// Value text, or the formula text for formula cells.
    pub text: String,
    pub formula: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetPreview {
    pub name: String,
    pub cells: Vec<PreviewCell>,
    pub merged: Vec<CellRange>,
}

/// Top-left corner of every worksheet, for authoring mapping tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatePreview {
    pub rows: u32,
    pub cols: u32,
    pub sheets: Vec<SheetPreview>,
}

/// Non-empty cells of the `rows × cols` window and the merged ranges of
/// each worksheet, in declaration order.
pub fn inspect<R: SpreadsheetReader>(
    workbook: &mut R,
    rows: u32,
    cols: u32,
) -> Result<TemplatePreview, R::Error> {
    let mut sheets = Vec::new();
    for name in workbook.sheet_names()? {
        let cells = if rows == 0 || cols == 0 {
            Vec::new()
        } else {
            workbook
                .read_range(&name, (1, 1), (rows, cols))?
                .into_iter()
                .filter_map(|((row, col), data)| {
                    let cell = CellRef::new(row, col).ok()?;
                    let text = data.display_text();
                    if text.is_empty() {
                        return None;
                    }
                    Some(PreviewCell {
                        cell,
                        formula: data.is_formula(),
                        text,
                    })
                })
                .collect()
        };
        let merged = MergeIndex::from_merged(&workbook.merged_cells(&name)?)
            .ranges()
            .to_vec();
        sheets.push(SheetPreview {
            name,
            cells,
            merged,
        });
    }
    Ok(TemplatePreview { rows, cols, sheets })
}

impl fmt::Display for TemplatePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sheets.iter().map(|s| s.name.as_str()).collect();
        writeln!(f, "sheets: {}", names.join(", "))?;
        for sheet in &self.sheets {
            writeln!(f)?;
            writeln!(f, "--- {} (first {} x {}) ---", sheet.name, self.rows, self.cols)?;
            for cell in &sheet.cells {
                let marker = if cell.formula { " [formula]" } else { "" };
                writeln!(f, "{:>6}: {}{}", cell.cell.to_string(), cell.text, marker)?;
            }
            if !sheet.merged.is_empty() {
                let merged: Vec<String> = sheet.merged.iter().map(ToString::to_string).collect();
                writeln!(f, "merged: {}", merged.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxfill_io::{CellData, JsonAdapter, MergedRange, SpreadsheetWriter};

    fn template() -> JsonAdapter {
        let mut wb = JsonAdapter::new();
        wb.create_sheet("A_Basic_Info").unwrap();
        wb.create_sheet("D_Tax_Due").unwrap();
        wb.write_cell("A_Basic_Info", 2, 1, CellData::from_value("PIN")).unwrap();
        wb.write_cell("A_Basic_Info", 20, 1, CellData::from_value("Footer")).unwrap();
        wb.write_cell("D_Tax_Due", 6, 3, CellData::from_formula("=C4*0.01")).unwrap();
        wb.merge_cells(
            "A_Basic_Info",
            MergedRange {
                start_row: 2,
                start_col: 3,
                end_row: 2,
                end_col: 4,
            },
        )
        .unwrap();
        wb
    }

    #[test]
    fn preview_is_windowed_and_ordered() {
        let preview = inspect(&mut template(), 15, 5).unwrap();
        assert_eq!(preview.sheets.len(), 2);
        let basic = &preview.sheets[0];
        assert_eq!(basic.name, "A_Basic_Info");
        assert_eq!(basic.cells.len(), 1);
        assert_eq!(basic.cells[0].text, "PIN");
        assert_eq!(basic.merged[0].to_string(), "C2:D2");
        let due = &preview.sheets[1];
        assert!(due.cells[0].formula);
        assert_eq!(due.cells[0].text, "=C4*0.01");
    }

    #[test]
    fn rendering_lists_sheets_first() {
        let text = inspect(&mut template(), 15, 5).unwrap().to_string();
        assert!(text.starts_with("sheets: A_Basic_Info, D_Tax_Due\n"));
        assert!(text.contains("    A2: PIN\n"));
        assert!(text.contains("    C6: =C4*0.01 [formula]\n"));
        assert!(text.contains("merged: C2:D2\n"));
    }
}
