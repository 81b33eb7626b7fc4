use chrono::NaiveDate;
use rust_decimal_macros::dec;
use taxfill_io::{
    CellData, CellRange, CellValue, MergedRange, SaveDestination, SpreadsheetReader,
    SpreadsheetWriter, UmyaAdapter,
};

fn build_template(path: &std::path::Path) {
    let mut book = umya_spreadsheet::new_file();
    book.get_sheet_by_name_mut("Sheet1")
        .unwrap()
        .set_name("A_Basic_Info");
    let _ = book.new_sheet("D_Tax_Due");
    {
        let ws = book.get_sheet_by_name_mut("A_Basic_Info").unwrap();
        ws.get_cell_mut((1, 2)).set_value("PIN");
        ws.add_merge_cells("C2:D2");
    }
    {
        let ws = book.get_sheet_by_name_mut("D_Tax_Due").unwrap();
        ws.get_cell_mut((2, 6)).set_value("Turnover for the Period");
        ws.get_cell_mut((3, 6)).set_formula("C4*0.01");
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

#[test]
fn umya_reads_merges_and_formulas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.xlsx");
    build_template(&path);

    let mut adapter = UmyaAdapter::open_path(&path).unwrap();
    assert_eq!(
        adapter.sheet_names().unwrap(),
        vec!["A_Basic_Info".to_string(), "D_Tax_Due".to_string()]
    );
    assert_eq!(
        adapter.merged_cells("A_Basic_Info").unwrap(),
        vec![MergedRange::from(CellRange::parse_a1("C2:D2").unwrap())]
    );
    let formula_cell = adapter.read_cell("D_Tax_Due", 6, 3).unwrap().unwrap();
    assert!(formula_cell.is_formula());
    assert_eq!(formula_cell.formula.as_deref(), Some("=C4*0.01"));
}

#[test]
fn umya_write_and_save_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.xlsx");
    let out = dir.path().join("filled.xlsx");
    build_template(&path);

    let mut adapter = UmyaAdapter::open_path(&path).unwrap();
    adapter
        .write_cell("A_Basic_Info", 2, 3, CellData::from_value("0012345"))
        .unwrap();
    adapter
        .write_cell("D_Tax_Due", 7, 3, CellData::from_value(dec!(1500.5)))
        .unwrap();
    adapter
        .write_cell(
            "A_Basic_Info",
            5,
            3,
            CellData::from_value(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        )
        .unwrap();
    adapter.save_to(SaveDestination::Path(&out)).unwrap();

    let mut reopened = UmyaAdapter::open_path(&out).unwrap();
    assert_eq!(
        reopened.read_cell("A_Basic_Info", 2, 3).unwrap().unwrap().value,
        Some(CellValue::Text("0012345".into()))
    );
    assert_eq!(
        reopened.read_cell("D_Tax_Due", 7, 3).unwrap().unwrap().value,
        Some(CellValue::Number(dec!(1500.5)))
    );
    assert_eq!(
        reopened.read_cell("A_Basic_Info", 5, 3).unwrap().unwrap().value,
        Some(CellValue::Number(dec!(45292)))
    );
}

#[test]
fn umya_refuses_unknown_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.xlsx");
    build_template(&path);

    let mut adapter = UmyaAdapter::open_path(&path).unwrap();
    assert!(
        adapter
            .write_cell("Turnover", 1, 1, CellData::from_value("x"))
            .is_err()
    );
    assert!(adapter.read_cell("Turnover", 1, 1).is_err());
    assert!(adapter.read_sheet("Turnover").is_err());
    assert!(adapter.merged_cells("Turnover").is_err());
    assert!(
        adapter
            .merge_cells(
                "Turnover",
                MergedRange::from(CellRange::parse_a1("A1:B1").unwrap())
            )
            .is_err()
    );
    // Known sheets stay usable after the refusals.
    assert_eq!(
        adapter.read_cell("A_Basic_Info", 2, 1).unwrap().unwrap().value,
        Some(CellValue::Text("PIN".into()))
    );
}
