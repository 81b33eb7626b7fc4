//! Spreadsheet backends for the Taxfill write engine.
//!
//! The engine only touches cell values and merge metadata; everything else a
//! template carries (styles, macro parts, defined names) is the backend's to
//! keep intact across load and save.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::JsonAdapter;
#[cfg(feature = "umya")]
pub use backends::UmyaAdapter;
pub use error::IoError;
pub use traits::{
    CellData, MergedRange, SaveDestination, SheetData, SpreadsheetReader, SpreadsheetWriter,
};

// Re-export for convenience
pub use taxfill_common::{CellRange, CellRef, CellValue};
