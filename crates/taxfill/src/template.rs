//! Backend selection for templates on disk.

use std::path::{Path, PathBuf};

use taxfill_engine::{
    AuditLog, FieldBindings, FillOptions, Instruction, ReturnPayload, TemplatePreview,
    apply_instructions, fill, inspect,
};
use taxfill_io::{JsonAdapter, SaveDestination, SpreadsheetReader, SpreadsheetWriter};
#[cfg(feature = "umya")]
use taxfill_io::UmyaAdapter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{path}: {message}")]
    Backend { path: PathBuf, message: String },

    #[error("{0}: xlsx templates need the `umya` feature")]
    XlsxDisabled(PathBuf),
}

impl TemplateError {
    fn backend(path: &Path, err: impl std::error::Error) -> Self {
        TemplateError::Backend {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// A template opened with the backend its extension calls for: `.json` files
/// use the JSON workbook format, everything else is treated as xlsx/xlsm.
pub enum Template {
    Json(JsonAdapter),
    #[cfg(feature = "umya")]
    Xlsx(UmyaAdapter),
}

macro_rules! with_backend {
    ($template:expr, $wb:ident => $body:expr) => {
        match $template {
            Template::Json($wb) => $body,
            #[cfg(feature = "umya")]
            Template::Xlsx($wb) => $body,
        }
    };
}

impl Template {
    pub fn open(path: &Path) -> Result<Self, TemplateError> {
        if is_json(path) {
            return JsonAdapter::open_path(path)
                .map(Template::Json)
                .map_err(|e| TemplateError::backend(path, e));
        }
        #[cfg(feature = "umya")]
        {
            UmyaAdapter::open_path(path)
                .map(Template::Xlsx)
                .map_err(|e| TemplateError::backend(path, e))
        }
        #[cfg(not(feature = "umya"))]
        {
            Err(TemplateError::XlsxDisabled(path.to_path_buf()))
        }
    }

    pub fn fill(
        &mut self,
        payload: &ReturnPayload,
        bindings: &FieldBindings,
        options: &FillOptions,
    ) -> AuditLog {
        with_backend!(self, wb => fill(wb, payload, bindings, options))
    }

    pub fn apply_instructions(
        &mut self,
        instructions: &[Instruction],
        options: &FillOptions,
    ) -> AuditLog {
        with_backend!(self, wb => apply_instructions(wb, instructions, options))
    }

    pub fn inspect(&mut self, rows: u32, cols: u32) -> Result<TemplatePreview, String> {
        with_backend!(self, wb => inspect(wb, rows, cols).map_err(|e| e.to_string()))
    }

    /// Write the workbook to `path`; the source template is never modified.
    pub fn save_as(&mut self, path: &Path) -> Result<(), TemplateError> {
        with_backend!(self, wb => wb
            .save_to(SaveDestination::Path(path))
            .map(|_| ())
            .map_err(|e| TemplateError::backend(path, e)))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
