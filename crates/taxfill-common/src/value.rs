use chrono::{Duration as ChronoDur, NaiveDate};
use rust_decimal::Decimal;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Excel's serial date system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom – doesn't exist, but Excel thinks it does)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
------------------------------------------------------------------- */

const EXCEL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const PHANTOM_CUTOVER: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();

pub fn date_to_serial(date: NaiveDate) -> i64 {
    let days = (date - EXCEL_EPOCH).num_days();
    // Dates on or after 1900-03-01 get +1 to account for phantom Feb 29
    if date >= PHANTOM_CUTOVER { days + 1 } else { days }
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    if days == 60 {
        return NaiveDate::from_ymd_opt(1900, 2, 28);
    }
    let offset = if days < 60 { days } else { days - 1 };
    EXCEL_EPOCH.checked_add_signed(ChronoDur::days(offset))
}

/// Typed value placed into (or read from) a template cell.
///
/// Money is carried as [`Decimal`]; conversion to the backend's native
/// representation happens at the I/O edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    Number(Decimal),
    Date(NaiveDate),
    Text(String),
    Boolean(bool),
    Empty,
}

impl CellValue {
    /// Text that begins with the formula marker.
    pub fn is_formula_text(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim_start().starts_with('='))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n.normalize()),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Untyped scalar as it arrives in a JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(n) => write!(f, "{n}"),
            RawValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn serial_matches_excel() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(date_to_serial(d(1900, 1, 1)), 1);
        assert_eq!(date_to_serial(d(1900, 2, 28)), 59);
        assert_eq!(date_to_serial(d(1900, 3, 1)), 61);
        assert_eq!(date_to_serial(d(2024, 1, 1)), 45292);
        assert_eq!(serial_to_date(45292.0), Some(d(2024, 1, 1)));
        assert_eq!(serial_to_date(60.0), Some(d(1900, 2, 28)));
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn formula_text_detection() {
        assert!(CellValue::from("=C4*0.01").is_formula_text());
        assert!(CellValue::from("  =SUM(A1:A3)").is_formula_text());
        assert!(!CellValue::from("C4=0").is_formula_text());
        assert!(!CellValue::Number(dec!(1)).is_formula_text());
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(CellValue::Number(dec!(1500.500)).to_string(), "1500.5");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()).to_string(),
            "2024-01-31"
        );
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn raw_value_untagged() {
        let raw: Vec<RawValue> = serde_json::from_str(r#"["1,500.50", 200, 2.5, true]"#).unwrap();
        assert_eq!(
            raw,
            vec![
                RawValue::Text("1,500.50".into()),
                RawValue::Int(200),
                RawValue::Float(2.5),
                RawValue::Bool(true),
            ]
        );
    }
}
