//! The fill pass: one fold over the bound fields that produces the audit log.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use taxfill_common::{CellRef, CellValue, RawValue};
use taxfill_io::{CellData, SpreadsheetReader, SpreadsheetWriter};
use taxfill_spec::{MetaField, SheetSelector, ValueType};

use crate::aggregate::{Aggregate, KindFilter, aggregate};
use crate::audit::{AuditLog, Note, Outcome, WriteResult};
use crate::binding::{BoundDerivation, BoundField, FieldBindings};
use crate::coerce::{coerce, coerce_untyped};
use crate::guard::{Verdict, check};
use crate::locate::{Located, LocatedVia, ScanWindow, locate};
use crate::merge::MergeIndex;
use crate::payload::{Instruction, ReturnPayload, TransactionRecord};
use crate::sheet::SheetResolver;

/// Knobs for a fill pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOptions {
    /// Redirect targets inside a merged range to the range's master cell.
    /// When off, such targets are reported as `skippedPlaceholder`.
    pub follow_merges: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            follow_merges: true,
        }
    }
}

/// Fill `workbook` from `payload` according to `bindings`.
///
/// Fields are processed in declaration order and each yields exactly one
/// audit entry. Nothing here aborts the pass.
pub fn fill<W>(
    workbook: &mut W,
    payload: &ReturnPayload,
    bindings: &FieldBindings,
    options: &FillOptions,
) -> AuditLog
where
    W: SpreadsheetReader + SpreadsheetWriter,
{
    let span = tracing::info_span!("fill", fields = bindings.fields().len());
    let _enter = span.enter();

    let mut run = Run::new(workbook, options, *bindings.window());
    for field in bindings.fields() {
        let entry = run.field(field, payload);
        run.record(entry);
    }
    run.finish()
}

/// Apply direct placements. Each instruction's sheet is matched as a keyword
/// and its cell goes through the same merge, guard and write path as `fill`.
pub fn apply_instructions<W>(
    workbook: &mut W,
    instructions: &[Instruction],
    options: &FillOptions,
) -> AuditLog
where
    W: SpreadsheetReader + SpreadsheetWriter,
{
    let span = tracing::info_span!("instructions", count = instructions.len());
    let _enter = span.enter();

    let mut run = Run::new(workbook, options, ScanWindow::default());
    for instruction in instructions {
        let entry = run.instruction(instruction);
        run.record(entry);
    }
    run.finish()
}

/// A value ready for the guard; a coercion failure only surfaces after the
/// go decision.
enum Pending {
    Raw(RawValue),
    Computed(Decimal),
    /// An aggregate that could not be represented; carries the reason.
    OutOfRange(String),
}

/// Per-pass state: sheet lookups, merge indexes, scan windows and
/// aggregates are loaded once and reused by later fields.
struct Run<'w, W> {
    workbook: &'w mut W,
    follow_merges: bool,
    window: ScanWindow,
    sheets: Option<SheetResolver>,
    merges: FxHashMap<String, MergeIndex>,
    windows: FxHashMap<String, BTreeMap<(u32, u32), CellData>>,
    aggregates: FxHashMap<KindFilter, Aggregate>,
    log: AuditLog,
}

impl<'w, W> Run<'w, W>
where
    W: SpreadsheetReader + SpreadsheetWriter,
{
    fn new(workbook: &'w mut W, options: &FillOptions, window: ScanWindow) -> Self {
        Self {
            workbook,
            follow_merges: options.follow_merges,
            window,
            sheets: None,
            merges: FxHashMap::default(),
            windows: FxHashMap::default(),
            aggregates: FxHashMap::default(),
            log: AuditLog::new(),
        }
    }

    fn record(&mut self, entry: WriteResult) {
        match entry.outcome {
            Outcome::Written => tracing::debug!(
                field = %entry.field_name,
                cell = ?entry.resolved.map(|c| c.to_string()),
                "written"
            ),
            outcome => tracing::warn!(
                field = %entry.field_name,
                %outcome,
                detail = entry.detail.as_deref().unwrap_or(""),
                "field skipped"
            ),
        }
        self.log.push(entry);
    }

    fn finish(self) -> AuditLog {
        tracing::info!(
            written = self.log.written(),
            total = self.log.len(),
            "pass complete"
        );
        self.log
    }

    fn field(&mut self, field: &BoundField, payload: &ReturnPayload) -> WriteResult {
        let name = field.name.as_str();
        let sheet = match self.sheet(&field.sheet) {
            Ok(Some(sheet)) => sheet,
            Ok(None) => {
                return WriteResult::new(name, Outcome::SheetNotFound)
                    .with_detail(format!("no worksheet matches `{}`", field.sheet));
            }
            Err(message) => return WriteResult::new(name, Outcome::BackendFailed).with_detail(message),
        };

        let window = self.window;
        let located = if field.locator.needs_window() {
            match self.window_cells(&sheet) {
                Ok(cells) => locate(&field.locator, &window, cells),
                Err(message) => {
                    return WriteResult::new(name, Outcome::BackendFailed)
                        .with_sheet(sheet)
                        .with_detail(message);
                }
            }
        } else {
            locate(&field.locator, &window, &BTreeMap::new())
        };
        let (candidate, via) = match located {
            Located::Found { target, via } => (target, via),
            Located::NotFound => {
                return WriteResult::new(name, Outcome::FieldNotFound)
                    .with_sheet(sheet)
                    .with_detail(format!(
                        "no label matching `{}` in the first {} row(s) x {} column(s)",
                        field.locator.keyword.as_deref().unwrap_or_default(),
                        window.header_rows,
                        window.leading_cols
                    ));
            }
        };

        let value = self.derive(&field.value, payload);
        let mut entry = self.place(name, sheet, candidate, value, Some(field.value_type));
        if let LocatedVia::Drift { declared, label } = via {
            if entry.detail.is_none() {
                entry.detail = Some(format!(
                    "declared {declared} replaced by label at {label}"
                ));
            }
        }
        entry
    }

    fn instruction(&mut self, instruction: &Instruction) -> WriteResult {
        let name = format!("{}!{}", instruction.sheet_keyword, instruction.cell);
        let selector = SheetSelector::Keyword(instruction.sheet_keyword.clone());
        let sheet = match self.sheet(&selector) {
            Ok(Some(sheet)) => sheet,
            Ok(None) => {
                return WriteResult::new(name, Outcome::SheetNotFound).with_detail(format!(
                    "no worksheet matches `{}`",
                    instruction.sheet_keyword
                ));
            }
            Err(message) => return WriteResult::new(name, Outcome::BackendFailed).with_detail(message),
        };
        let candidate = match CellRef::parse_a1(&instruction.cell) {
            Ok(cell) => cell,
            Err(err) => {
                return WriteResult::new(name, Outcome::FieldNotFound)
                    .with_sheet(sheet)
                    .with_detail(err.to_string());
            }
        };
        let value = instruction.value.clone().map(Pending::Raw);
        self.place(&name, sheet, candidate, value, None)
    }

    /// Merge redirect, guard, coerce, write.
    fn place(
        &mut self,
        name: &str,
        sheet: String,
        candidate: CellRef,
        value: Option<Pending>,
        hint: Option<ValueType>,
    ) -> WriteResult {
        let merges = match self.merge_index(&sheet) {
            Ok(merges) => merges.clone(),
            Err(message) => {
                return WriteResult::new(name, Outcome::BackendFailed)
                    .with_sheet(sheet)
                    .at(candidate)
                    .with_detail(message);
            }
        };
        let target = if self.follow_merges {
            merges.resolve_master(candidate)
        } else {
            candidate
        };
        let entry = WriteResult::new(name, Outcome::Written)
            .with_sheet(sheet.clone())
            .at(target);

        let current = match self.workbook.read_cell(&sheet, target.row(), target.col()) {
            Ok(current) => current,
            Err(err) => {
                return WriteResult {
                    outcome: Outcome::BackendFailed,
                    ..entry
                }
                .with_detail(err.to_string());
            }
        };

        let typed = value.map(|value| match value {
            Pending::Computed(n) => Ok(CellValue::Number(n)),
            Pending::OutOfRange(detail) => Err(detail),
            Pending::Raw(raw) => {
                let coerced = match hint {
                    Some(hint) => coerce(&raw, hint),
                    None => coerce_untyped(&raw),
                };
                coerced.map_err(|err| err.to_string())
            }
        });
        let attempted = match &typed {
            Some(Ok(v)) => Some(v.clone()),
            _ => None,
        };

        match check(&merges, target, current.as_ref(), typed.is_some()) {
            Verdict::Proceed => {}
            Verdict::Placeholder { master } => {
                return WriteResult {
                    outcome: Outcome::SkippedPlaceholder,
                    value: attempted,
                    ..entry
                }
                .with_detail(format!("merged into {master}"));
            }
            Verdict::Formula(formula) => {
                return WriteResult {
                    outcome: Outcome::SkippedFormula,
                    value: attempted,
                    ..entry
                }
                .with_detail(formula);
            }
            Verdict::NoValue => {
                return WriteResult {
                    outcome: Outcome::SkippedNoValue,
                    ..entry
                };
            }
        }

        let typed = match typed {
            Some(Ok(v)) => v,
            Some(Err(detail)) => {
                return WriteResult {
                    outcome: Outcome::CoercionFailed,
                    ..entry
                }
                .with_detail(detail);
            }
            None => {
                return WriteResult {
                    outcome: Outcome::SkippedNoValue,
                    ..entry
                };
            }
        };

        let written = self.workbook.write_cell(
            &sheet,
            target.row(),
            target.col(),
            CellData::from_value(typed.clone()),
        );
        if self.window.contains(target.row(), target.col()) {
            self.windows.remove(&sheet);
        }
        match written {
            Ok(()) => entry.with_value(typed),
            Err(err) => WriteResult {
                outcome: Outcome::BackendFailed,
                ..entry
            }
            .with_value(typed)
            .with_detail(err.to_string()),
        }
    }

    fn derive(&mut self, derivation: &BoundDerivation, payload: &ReturnPayload) -> Option<Pending> {
        let meta = &payload.meta;
        match derivation {
            BoundDerivation::Literal(raw) => raw.clone().map(Pending::Raw),
            BoundDerivation::Meta(field) => {
                let text = match field {
                    MetaField::TaxId => meta.tax_id.clone(),
                    MetaField::PeriodFrom => meta.period_from.clone(),
                    MetaField::PeriodTo => meta.period_to.clone(),
                    MetaField::ReturnType => Some(meta.return_type_or_default().to_string()),
                };
                text.map(|t| Pending::Raw(RawValue::Text(t)))
            }
            BoundDerivation::Aggregate { filter, rate } => {
                let agg = self.aggregate_for(filter, &payload.transactions);
                let value = match rate {
                    Some(rate) => agg.rated(*rate),
                    None => agg.sum(),
                };
                Some(match (value, rate) {
                    (Some(n), _) => Pending::Computed(n),
                    (None, Some(rate)) => {
                        Pending::OutOfRange(format!("{filter} total x {rate} is out of range"))
                    }
                    (None, None) => Pending::OutOfRange(format!("{filter} total is out of range")),
                })
            }
        }
    }

    fn aggregate_for(&mut self, filter: &KindFilter, records: &[TransactionRecord]) -> &Aggregate {
        if !self.aggregates.contains_key(filter) {
            let agg = aggregate(records, filter);
            for failure in &agg.failures {
                self.log.note(Note::CoercionFailure {
                    filter: filter.to_string(),
                    index: failure.index,
                    raw: failure.raw.clone(),
                });
            }
            if let Some(index) = agg.overflow {
                self.log.note(Note::AggregateOverflow {
                    filter: filter.to_string(),
                    index,
                });
            }
            self.aggregates.insert(filter.clone(), agg);
        }
        &self.aggregates[filter]
    }

    fn sheet(&mut self, selector: &SheetSelector) -> Result<Option<String>, String> {
        if self.sheets.is_none() {
            let names = self.workbook.sheet_names().map_err(|e| e.to_string())?;
            self.sheets = Some(SheetResolver::new(names));
        }
        Ok(self
            .sheets
            .as_mut()
            .and_then(|resolver| resolver.resolve(selector))
            .map(str::to_string))
    }

    fn merge_index(&mut self, sheet: &str) -> Result<&MergeIndex, String> {
        if !self.merges.contains_key(sheet) {
            let merged = self.workbook.merged_cells(sheet).map_err(|e| e.to_string())?;
            let index = MergeIndex::from_merged(&merged);
            for (first, second) in index.overlaps() {
                tracing::warn!(sheet, %first, %second, "overlapping merged ranges");
                self.log.note(Note::OverlappingMerge {
                    sheet: sheet.to_string(),
                    first,
                    second,
                });
            }
            self.merges.insert(sheet.to_string(), index);
        }
        Ok(&self.merges[sheet])
    }

    fn window_cells(&mut self, sheet: &str) -> Result<&BTreeMap<(u32, u32), CellData>, String> {
        if !self.windows.contains_key(sheet) {
            let (start, end) = self.window.bounds();
            let cells = self
                .workbook
                .read_range(sheet, start, end)
                .map_err(|e| e.to_string())?;
            self.windows.insert(sheet.to_string(), cells);
        }
        Ok(&self.windows[sheet])
    }
}
