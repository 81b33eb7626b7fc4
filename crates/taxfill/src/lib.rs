//! Meta crate that re-exports the Taxfill building blocks and hosts the
//! command-line front end's workbook loading.

pub use taxfill_common as common;
pub use taxfill_engine as engine;
pub use taxfill_io as io;
pub use taxfill_spec as spec;

pub use taxfill_engine::{
    AuditLog, FieldBindings, FillOptions, Outcome, Payload, ReturnPayload, TaxFill, WriteResult,
    apply_instructions, fill, inspect,
};
pub use taxfill_spec::FieldMap;

pub mod template;
