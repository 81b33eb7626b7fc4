//! Shared vocabulary for the Taxfill crates: A1 coordinates, rectangular
//! ranges, typed cell values and the raw scalars found in input payloads.

pub mod coord;
pub mod range;
pub mod value;

pub use coord::{CellRef, CoordError, column_to_letters, letters_to_column};
pub use range::CellRange;
pub use value::{CellValue, RawValue, date_to_serial, serial_to_date};
