use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use taxfill_common::{CellRef, RawValue, letters_to_column};
use taxfill_spec::{
    AnswerColumn, Derivation, FieldMap, FieldSpec, MetaField, SearchWindow, SheetSelector,
    ValueType,
};

use crate::aggregate::KindFilter;
use crate::error::EngineError;
use crate::locate::{AnswerTarget, BoundLocator, ScanWindow, normalize_label};

/// Validated mapping with every field bound for the engine.
#[derive(Debug, Clone)]
pub struct FieldBindings {
    map: FieldMap,
    window: ScanWindow,
    fields: Vec<BoundField>,
}

impl FieldBindings {
    /// Validate and bind a mapping into runtime-friendly structures.
    pub fn new(map: FieldMap) -> Result<Self, EngineError> {
        map.validate()?;
        let window = bind_window(&map.search)?;
        let mut fields = Vec::with_capacity(map.fields.len());
        for (idx, field) in map.fields.iter().enumerate() {
            fields.push(BoundField::bind(idx, field)?);
        }
        Ok(Self {
            map,
            window,
            fields,
        })
    }

    /// Access the original mapping.
    pub fn manifest(&self) -> &FieldMap {
        &self.map
    }

    pub fn window(&self) -> &ScanWindow {
        &self.window
    }

    /// Bound fields in declaration order.
    pub fn fields(&self) -> &[BoundField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&BoundField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn into_parts(self) -> (FieldMap, Vec<BoundField>) {
        (self.map, self.fields)
    }
}

fn bind_window(search: &SearchWindow) -> Result<ScanWindow, EngineError> {
    let answer = match &search.answer {
        AnswerColumn::Offset(delta) => AnswerTarget::Offset(i64::from(*delta)),
        AnswerColumn::Column(letters) => {
            let col = letters_to_column(&letters.trim().to_ascii_uppercase())
                .ok_or_else(|| EngineError::InvalidAnswerColumn(letters.clone()))?;
            AnswerTarget::Column(col)
        }
    };
    Ok(ScanWindow {
        header_rows: search.header_rows,
        leading_cols: search.leading_cols,
        answer,
    })
}

/// Source of a bound field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundDerivation {
    /// `None` for a `null` literal.
    Literal(Option<RawValue>),
    Meta(MetaField),
    Aggregate {
        filter: KindFilter,
        rate: Option<Decimal>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub index: usize,
    pub name: String,
    pub sheet: SheetSelector,
    pub locator: BoundLocator,
    pub value: BoundDerivation,
    pub value_type: ValueType,
}

impl BoundField {
    fn bind(index: usize, field: &FieldSpec) -> Result<Self, EngineError> {
        let fixed = match &field.locate.cell {
            Some(cell) => Some(CellRef::parse_a1(cell).map_err(|source| {
                EngineError::InvalidCoordinate {
                    field: field.name.clone(),
                    cell: cell.clone(),
                    source,
                }
            })?),
            None => None,
        };
        let locator = BoundLocator {
            fixed,
            keyword: field.locate.search.as_deref().map(normalize_label),
        };
        let value = match &field.value {
            Derivation::Literal(json) => BoundDerivation::Literal(literal_to_raw(json)),
            Derivation::Meta(meta) => BoundDerivation::Meta(*meta),
            Derivation::Aggregate(agg) => {
                let rate = match &agg.rate {
                    Some(text) => Some(Decimal::from_str(text.trim()).map_err(|_| {
                        EngineError::InvalidRate {
                            field: field.name.clone(),
                            rate: text.clone(),
                        }
                    })?),
                    None => None,
                };
                BoundDerivation::Aggregate {
                    filter: KindFilter::parse(&agg.of),
                    rate,
                }
            }
        };
        Ok(Self {
            index,
            name: field.name.clone(),
            sheet: field.sheet.clone(),
            locator,
            value,
            value_type: field.value_type,
        })
    }
}

fn literal_to_raw(json: &JsonValue) -> Option<RawValue> {
    match json {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(RawValue::Bool(*b)),
        JsonValue::Number(n) => Some(match n.as_i64() {
            Some(i) => RawValue::Int(i),
            None => RawValue::Text(n.to_string()),
        }),
        JsonValue::String(s) => Some(RawValue::Text(s.clone())),
        other => Some(RawValue::Text(other.to_string())),
    }
}
