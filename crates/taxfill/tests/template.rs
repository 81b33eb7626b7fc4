use taxfill::common::{CellValue, CellRange};
use taxfill::io::{CellData, JsonAdapter, MergedRange, SpreadsheetReader, SpreadsheetWriter};
use taxfill::template::{Template, TemplateError};
use taxfill::{FieldBindings, FieldMap, FillOptions, Outcome, Payload};

const KRA_MAPPING: &str = include_str!("../../taxfill-spec/tests/fixtures/kra_tot.yaml");

fn write_template(dir: &std::path::Path) -> std::path::PathBuf {
    let mut wb = JsonAdapter::new();
    wb.create_sheet("A_Basic_Info").unwrap();
    wb.create_sheet("D_Tax_Due").unwrap();
    wb.write_cell("A_Basic_Info", 2, 2, CellData::from_value("PIN")).unwrap();
    wb.merge_cells(
        "A_Basic_Info",
        MergedRange::from("C2:D2".parse::<CellRange>().unwrap()),
    )
    .unwrap();
    wb.write_cell("D_Tax_Due", 4, 2, CellData::from_value("Gross Turnover")).unwrap();
    wb.write_cell("D_Tax_Due", 6, 3, CellData::from_formula("=C4*0.01")).unwrap();
    let path = dir.join("template.json");
    std::fs::write(&path, wb.to_json_string().unwrap()).unwrap();
    path
}

#[test]
fn json_template_round_trips_through_fill() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = write_template(dir.path());
    let out_path = dir.path().join("filled.json");

    let bindings = FieldBindings::new(FieldMap::from_yaml_str(KRA_MAPPING).unwrap()).unwrap();
    let payload = match Payload::from_json_str(
        r#"{"meta": {"taxId": "A123456789Z"}, "transactions": [{"type": "SALE", "amount": 1000}]}"#,
    )
    .unwrap()
    {
        Payload::Return(ret) => ret,
        other => panic!("unexpected payload: {other:?}"),
    };

    let mut template = Template::open(&template_path).unwrap();
    let log = template.fill(&payload, &bindings, &FillOptions::default());
    template.save_as(&out_path).unwrap();

    assert_eq!(log.entry("pin").unwrap().outcome, Outcome::Written);
    assert_eq!(log.entry("period_from").unwrap().outcome, Outcome::SkippedNoValue);
    assert_eq!(log.entry("tax_due").unwrap().outcome, Outcome::SkippedFormula);

    let mut filled = JsonAdapter::open_path(&out_path).unwrap();
    assert_eq!(
        filled.read_cell("A_Basic_Info", 2, 3).unwrap().unwrap().value,
        Some(CellValue::Text("A123456789Z".into()))
    );
    assert_eq!(
        filled.read_cell("D_Tax_Due", 4, 3).unwrap().unwrap().value,
        Some(CellValue::Number(1000.into()))
    );

    // The template itself is untouched.
    let mut original = JsonAdapter::open_path(&template_path).unwrap();
    assert_eq!(original.read_cell("A_Basic_Info", 2, 3).unwrap(), None);
}

#[test]
fn preview_lists_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let mut template = Template::open(&write_template(dir.path())).unwrap();
    let preview = template.inspect(15, 5).unwrap();
    let names: Vec<_> = preview.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A_Basic_Info", "D_Tax_Due"]);
}

#[test]
fn missing_template_reports_its_path() {
    let err = match Template::open(std::path::Path::new("does/not/exist.json")) {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    match err {
        TemplateError::Backend { path, .. } => assert!(path.ends_with("exist.json")),
        other => panic!("unexpected error: {other:?}"),
    }
}
