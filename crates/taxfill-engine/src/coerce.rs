use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use taxfill_common::{CellValue, RawValue};
use taxfill_spec::ValueType;
use thiserror::Error;

const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

/// A raw value that cannot be read as a decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read `{raw}` as a number")]
pub struct CoercionError {
    pub raw: String,
}

impl CoercionError {
    fn new(raw: &RawValue) -> Self {
        Self {
            raw: raw.to_string(),
        }
    }
}

/// Parse a monetary amount.
///
/// Thousands separators and whitespace are stripped before parsing; `1e3`
/// style exponents are accepted. Booleans and non-finite floats fail.
pub fn coerce_number(raw: &RawValue) -> Result<Decimal, CoercionError> {
    match raw {
        RawValue::Int(i) => Ok(Decimal::from(*i)),
        RawValue::Float(f) => Decimal::try_from(*f).map_err(|_| CoercionError::new(raw)),
        RawValue::Bool(_) => Err(CoercionError::new(raw)),
        RawValue::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return Err(CoercionError::new(raw));
            }
            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .map_err(|_| CoercionError::new(raw))
        }
    }
}

/// `DD/MM/YYYY` or `YYYY-MM-DD` become dates; anything else is kept as text.
pub fn coerce_date(text: &str) -> CellValue {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(CellValue::Date)
        .unwrap_or_else(|| CellValue::Text(text.to_string()))
}

/// Coerce a present raw value according to the field's type hint.
///
/// Only `number` can fail; dates fall back to text and text never fails.
pub fn coerce(raw: &RawValue, hint: ValueType) -> Result<CellValue, CoercionError> {
    match hint {
        ValueType::Number => coerce_number(raw).map(CellValue::Number),
        ValueType::Date => Ok(match raw {
            RawValue::Text(text) => coerce_date(text),
            other => CellValue::Text(other.to_string()),
        }),
        ValueType::Text => Ok(match raw {
            RawValue::Text(text) => CellValue::Text(text.clone()),
            other => CellValue::Text(other.to_string()),
        }),
    }
}

/// Typed value for an untyped instruction: numbers stay numbers, booleans
/// stay booleans, text is written verbatim.
pub fn coerce_untyped(raw: &RawValue) -> Result<CellValue, CoercionError> {
    match raw {
        RawValue::Int(_) | RawValue::Float(_) => coerce_number(raw).map(CellValue::Number),
        RawValue::Bool(b) => Ok(CellValue::Boolean(*b)),
        RawValue::Text(text) => Ok(CellValue::Text(text.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn numbers_strip_separators() {
        assert_eq!(coerce_number(&"1,500.50".into()), Ok(dec!(1500.50)));
        assert_eq!(coerce_number(&" 2 000 ".into()), Ok(dec!(2000)));
        assert_eq!(coerce_number(&"-12.5".into()), Ok(dec!(-12.5)));
        assert_eq!(coerce_number(&"1e3".into()), Ok(dec!(1000)));
        assert_eq!(coerce_number(&RawValue::Int(200)), Ok(dec!(200)));
        assert_eq!(coerce_number(&RawValue::Float(2.5)), Ok(dec!(2.5)));
    }

    #[test]
    fn numbers_fail_loudly() {
        let err = coerce_number(&"bad".into()).unwrap_err();
        assert_eq!(err.raw, "bad");
        assert_eq!(err.to_string(), "cannot read `bad` as a number");
        assert!(coerce_number(&"".into()).is_err());
        assert!(coerce_number(&RawValue::Bool(true)).is_err());
        assert!(coerce_number(&RawValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn dates_accept_two_layouts_and_pass_through_otherwise() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(coerce_date("31/01/2024"), CellValue::Date(jan31));
        assert_eq!(coerce_date("2024-01-31"), CellValue::Date(jan31));
        assert_eq!(coerce_date("Jan 2024"), CellValue::Text("Jan 2024".into()));
        assert_eq!(coerce_date("31/13/2024"), CellValue::Text("31/13/2024".into()));
    }

    #[test]
    fn text_keeps_empty_strings() {
        assert_eq!(coerce(&"".into(), ValueType::Text), Ok(CellValue::Text(String::new())));
        assert_eq!(
            coerce(&RawValue::Int(12345), ValueType::Text),
            Ok(CellValue::Text("12345".into()))
        );
        assert_eq!(
            coerce(&"0012345".into(), ValueType::Text),
            Ok(CellValue::Text("0012345".into()))
        );
    }

    #[test]
    fn untyped_values_keep_their_shape() {
        assert_eq!(coerce_untyped(&RawValue::Int(3)), Ok(CellValue::Number(dec!(3))));
        assert_eq!(coerce_untyped(&RawValue::Bool(false)), Ok(CellValue::Boolean(false)));
        assert_eq!(coerce_untyped(&"1,000".into()), Ok(CellValue::Text("1,000".into())));
    }
}
