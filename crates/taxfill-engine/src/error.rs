use taxfill_common::CoordError;
use taxfill_spec::ValidationError;
use thiserror::Error;

/// Errors raised while binding a mapping to the engine.
///
/// A bound mapping never fails at fill time; per-field problems end up in the
/// audit log instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidManifest(#[from] ValidationError),

    #[error("field `{field}`: invalid coordinate `{cell}`: {source}")]
    InvalidCoordinate {
        field: String,
        cell: String,
        #[source]
        source: CoordError,
    },

    #[error("field `{field}`: invalid rate `{rate}`")]
    InvalidRate { field: String, rate: String },

    #[error("answer column `{0}` is not a column letter")]
    InvalidAnswerColumn(String),
}
