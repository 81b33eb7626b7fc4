use std::fmt;

use serde::Serialize;
use taxfill_common::{CellRange, CellRef, CellValue};

/// What happened to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Written,
    SkippedFormula,
    SkippedPlaceholder,
    SkippedNoValue,
    SheetNotFound,
    FieldNotFound,
    CoercionFailed,
    BackendFailed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Written => "written",
            Outcome::SkippedFormula => "skippedFormula",
            Outcome::SkippedPlaceholder => "skippedPlaceholder",
            Outcome::SkippedNoValue => "skippedNoValue",
            Outcome::SheetNotFound => "sheetNotFound",
            Outcome::FieldNotFound => "fieldNotFound",
            Outcome::CoercionFailed => "coercionFailed",
            Outcome::BackendFailed => "backendFailed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub field_name: String,
    pub sheet: Option<String>,
    #[serde(rename = "resolvedCoordinate")]
    pub resolved: Option<CellRef>,
    pub outcome: Outcome,
    pub value: Option<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl WriteResult {
    pub fn new(field_name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            field_name: field_name.into(),
            sheet: None,
            resolved: None,
            outcome,
            value: None,
            detail: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn at(mut self, cell: CellRef) -> Self {
        self.resolved = Some(cell);
        self
    }

    pub fn with_value(mut self, value: CellValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Diagnostics that do not belong to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Note {
    /// A transaction amount that was counted as zero.
    #[serde(rename_all = "camelCase")]
    CoercionFailure {
        filter: String,
        index: usize,
        raw: Option<String>,
    },
    /// A running total left the decimal range at `index`; the aggregate
    /// is not written.
    #[serde(rename_all = "camelCase")]
    AggregateOverflow { filter: String, index: usize },
    #[serde(rename_all = "camelCase")]
    OverlappingMerge {
        sheet: String,
        first: CellRange,
        second: CellRange,
    },
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::CoercionFailure {
                filter,
                index,
                raw: Some(raw),
            } => write!(
                f,
                "coercion failure: transactions[{index}] ({filter}) amount `{raw}` counted as 0"
            ),
            Note::CoercionFailure {
                filter,
                index,
                raw: None,
            } => write!(
                f,
                "coercion failure: transactions[{index}] ({filter}) has no amount, counted as 0"
            ),
            Note::AggregateOverflow { filter, index } => write!(
                f,
                "aggregate overflow: {filter} total out of range at transactions[{index}]"
            ),
            Note::OverlappingMerge {
                sheet,
                first,
                second,
            } => write!(f, "overlapping merges on {sheet}: {first} and {second}"),
        }
    }
}

/// Ordered, append-only record of a fill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditLog {
    entries: Vec<WriteResult>,
    notes: Vec<Note>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: WriteResult) {
        self.entries.push(entry);
    }

    pub fn note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn entries(&self) -> &[WriteResult] {
        &self.entries
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn entry(&self, field_name: &str) -> Option<&WriteResult> {
        self.entries.iter().find(|e| e.field_name == field_name)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn written(&self) -> usize {
        self.count(Outcome::Written)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{:<18} {}", entry.outcome.as_str(), entry.field_name)?;
            match (&entry.sheet, entry.resolved) {
                (Some(sheet), Some(cell)) => write!(f, " @ {sheet}!{cell}")?,
                (Some(sheet), None) => write!(f, " @ {sheet}")?,
                _ => {}
            }
            if let Some(value) = &entry.value {
                write!(f, " = {value:?}")?;
            }
            if let Some(detail) = &entry.detail {
                write!(f, " ({detail})")?;
            }
            writeln!(f)?;
        }
        for note in &self.notes {
            writeln!(f, "note: {note}")?;
        }
        write!(
            f,
            "{} of {} field(s) written",
            self.written(),
            self.entries.len()
        )
    }
}
