//! Taxfill engine.
//!
//! Resolves the semantic fields of a mapping to cells of a spreadsheet
//! template and writes them without ever overwriting a formula or a merge
//! placeholder. See [`fill`] for the declarative pass and
//! [`apply_instructions`] for raw placements.

mod aggregate;
mod audit;
mod binding;
mod coerce;
mod engine;
mod error;
mod guard;
mod inspect;
mod locate;
mod merge;
mod payload;
mod runtime;
mod sheet;

pub use aggregate::{Aggregate, AmountFailure, KindFilter, aggregate, aggregate_by};
pub use audit::{AuditLog, Note, Outcome, WriteResult};
pub use binding::{BoundDerivation, BoundField, FieldBindings};
pub use coerce::{CoercionError, coerce, coerce_date, coerce_number, coerce_untyped};
pub use engine::{FillOptions, apply_instructions, fill};
pub use error::EngineError;
pub use guard::{Verdict, check};
pub use inspect::{PreviewCell, SheetPreview, TemplatePreview, inspect};
pub use locate::{
    AnswerTarget, BoundLocator, Located, LocatedVia, ScanWindow, locate, normalize_label,
    try_fixed, try_search,
};
pub use merge::{MergeIndex, resolve_master};
pub use payload::{EntityMeta, Instruction, Payload, ReturnPayload, TransactionKind, TransactionRecord};
pub use runtime::TaxFill;
pub use sheet::{SheetMatch, SheetResolver, match_sheet};
