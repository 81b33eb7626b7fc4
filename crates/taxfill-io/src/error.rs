use thiserror::Error;

/// Errors surfaced by the bundled backends.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("sheet `{0}` not found")]
    SheetNotFound(String),

    #[error("invalid cell {sheet}!R{row}C{col}: {message}")]
    InvalidCell {
        sheet: String,
        row: u32,
        col: u32,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
