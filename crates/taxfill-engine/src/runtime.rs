use taxfill_io::{SpreadsheetReader, SpreadsheetWriter};
use taxfill_spec::FieldMap;

use crate::audit::AuditLog;
use crate::binding::{BoundField, FieldBindings};
use crate::engine::{FillOptions, apply_instructions, fill};
use crate::error::EngineError;
use crate::payload::{Payload, ReturnPayload};

/// Pairs a bound mapping with the workbook it fills.
///
/// The workbook is owned for the lifetime of the session and handed back by
/// [`TaxFill::into_parts`] once filling is done.
pub struct TaxFill<W> {
    workbook: W,
    bindings: FieldBindings,
    options: FillOptions,
}

impl<W> TaxFill<W>
where
    W: SpreadsheetReader + SpreadsheetWriter,
{
    /// Validate and bind the mapping, and take ownership of the workbook.
    pub fn new(workbook: W, map: FieldMap) -> Result<Self, EngineError> {
        Ok(Self::with_bindings(workbook, FieldBindings::new(map)?))
    }

    pub fn with_bindings(workbook: W, bindings: FieldBindings) -> Self {
        Self {
            workbook,
            bindings,
            options: FillOptions::default(),
        }
    }

    pub fn options(mut self, options: FillOptions) -> Self {
        self.options = options;
        self
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut W {
        &mut self.workbook
    }

    pub fn manifest(&self) -> &FieldMap {
        self.bindings.manifest()
    }

    pub fn fields(&self) -> &[BoundField] {
        self.bindings.fields()
    }

    pub fn fill(&mut self, payload: &ReturnPayload) -> AuditLog {
        fill(&mut self.workbook, payload, &self.bindings, &self.options)
    }

    /// Dispatch on the payload shape: mapped fields or raw instructions.
    pub fn run(&mut self, payload: &Payload) -> AuditLog {
        match payload {
            Payload::Return(ret) => self.fill(ret),
            Payload::Instructions { instructions } => {
                apply_instructions(&mut self.workbook, instructions, &self.options)
            }
        }
    }

    pub fn into_parts(self) -> (W, FieldBindings) {
        (self.workbook, self.bindings)
    }
}
