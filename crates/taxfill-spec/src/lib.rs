//! Mapping manifests for Taxfill.
//!
//! A manifest pins each semantic field of a return (PIN, period, turnover,
//! tax due, ...) to a worksheet and a cell, or to a label that the engine
//! searches for when templates drift between revisions.

mod manifest;
mod validation;

pub use manifest::*;
pub use validation::{ManifestIssue, ValidationError};

use once_cell::sync::Lazy;
use schemars::schema_for;

static SCHEMA_JSON: Lazy<String> = Lazy::new(generate_schema_json_pretty);

/// JSON Schema for [`FieldMap`], generated once per process.
pub fn schema_json() -> &'static str {
    SCHEMA_JSON.as_str()
}

pub fn generate_schema_value() -> serde_json::Value {
    serde_json::to_value(schema_for!(FieldMap)).unwrap_or(serde_json::Value::Null)
}

pub fn generate_schema_json_pretty() -> String {
    serde_json::to_string_pretty(&generate_schema_value()).unwrap_or_default()
}
