use rust_decimal_macros::dec;
use taxfill_io::{
    CellData, CellRange, CellValue, JsonAdapter, MergedRange, SaveDestination, SpreadsheetReader,
    SpreadsheetWriter,
};

fn template() -> JsonAdapter {
    let mut adapter = JsonAdapter::new();
    adapter.create_sheet("A_Basic_Info").unwrap();
    adapter.create_sheet("D_Tax_Due").unwrap();
    adapter
        .write_cell("A_Basic_Info", 2, 1, CellData::from_value("PIN"))
        .unwrap();
    adapter
        .write_cell("D_Tax_Due", 6, 3, CellData::from_formula("=C4*0.01"))
        .unwrap();
    adapter
        .merge_cells(
            "A_Basic_Info",
            MergedRange::from(CellRange::parse_a1("C2:D2").unwrap()),
        )
        .unwrap();
    adapter
}

#[test]
fn json_roundtrip_in_memory_bytes() {
    let mut adapter = template();
    adapter
        .write_cell("D_Tax_Due", 7, 3, CellData::from_value(dec!(1500.50)))
        .unwrap();

    let bytes = adapter.save_to_bytes().unwrap();
    let mut reopened = JsonAdapter::open_bytes(bytes).unwrap();

    assert_eq!(
        reopened.sheet_names().unwrap(),
        vec!["A_Basic_Info".to_string(), "D_Tax_Due".to_string()]
    );
    let data = reopened.read_sheet("D_Tax_Due").unwrap();
    assert_eq!(
        data.cells.get(&(7, 3)).unwrap().value,
        Some(CellValue::Number(dec!(1500.50)))
    );
    assert_eq!(
        data.cells.get(&(6, 3)).unwrap().formula.as_deref(),
        Some("=C4*0.01")
    );
    assert_eq!(
        reopened.merged_cells("A_Basic_Info").unwrap(),
        vec![MergedRange {
            start_row: 2,
            start_col: 3,
            end_row: 2,
            end_col: 4
        }]
    );
}

#[test]
fn json_schema_shape() {
    let adapter = template();
    let s = adapter.to_json_string().unwrap();
    let v: serde_json::Value = serde_json::from_str(&s).unwrap();

    assert!(v["sheets"].is_array());
    assert_eq!(v["sheets"][0]["name"], "A_Basic_Info");
    assert_eq!(v["sheets"][0]["cells"][0]["row"], 2);
    assert_eq!(v["sheets"][0]["cells"][0]["col"], 1);
    assert_eq!(v["sheets"][0]["cells"][0]["value"]["type"], "Text");
    assert_eq!(v["sheets"][0]["cells"][0]["value"]["value"], "PIN");
    assert_eq!(v["sheets"][0]["merged_cells"][0]["end_col"], 4);
    let mut keys: Vec<_> = v["sheets"][0].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["cells", "merged_cells", "name"]);
}

#[test]
fn read_range_is_windowed_and_row_major() {
    let mut adapter = JsonAdapter::new();
    adapter.create_sheet("S").unwrap();
    for (r, c) in [(3, 1), (1, 2), (1, 1), (2, 5), (40, 1)] {
        adapter
            .write_cell("S", r, c, CellData::from_value(format!("R{r}C{c}")))
            .unwrap();
    }
    let window = adapter.read_range("S", (1, 1), (30, 2)).unwrap();
    let keys: Vec<_> = window.keys().copied().collect();
    assert_eq!(keys, vec![(1, 1), (1, 2), (3, 1)]);
}

#[test]
fn writes_to_unknown_sheet_fail() {
    let mut adapter = template();
    let err = adapter
        .write_cell("Missing", 1, 1, CellData::from_value("x"))
        .unwrap_err();
    assert!(matches!(err, taxfill_io::IoError::SheetNotFound(name) if name == "Missing"));
}

#[test]
fn empty_write_clears_cell() {
    let mut adapter = template();
    adapter
        .write_cell("A_Basic_Info", 2, 1, CellData::default())
        .unwrap();
    assert!(adapter.read_cell("A_Basic_Info", 2, 1).unwrap().is_none());
}

#[test]
fn save_to_path_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.json");
    let mut adapter = template();
    adapter.save_to(SaveDestination::Path(&path)).unwrap();

    let mut reopened = JsonAdapter::open_path(&path).unwrap();
    assert_eq!(
        reopened.read_cell("A_Basic_Info", 2, 1).unwrap(),
        Some(CellData::from_value("PIN"))
    );
    reopened
        .write_cell("A_Basic_Info", 2, 3, CellData::from_value("A123456789Z"))
        .unwrap();
    reopened.save_to(SaveDestination::Path(&path)).unwrap();

    let mut again = JsonAdapter::open_path(&path).unwrap();
    assert_eq!(
        again.read_cell("A_Basic_Info", 2, 3).unwrap(),
        Some(CellData::from_value("A123456789Z"))
    );
}
