use thiserror::Error;

/// Crate-wide error type.
///
/// Everything here is a contract violation between the solver and the damage
/// engine and is surfaced immediately. There are no retry semantics.
#[derive(Error, Debug)]
pub enum DamageError {
    #[error("shape mismatch for {name}: expected {expected}, got {got}")]
    ShapeMismatch {
        name: &'static str,
        expected: String,
        got: String,
    },

    #[error("{model} does not support {operation}")]
    UnsupportedEvaluation {
        model: &'static str,
        operation: &'static str,
    },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("temperature {temperature} outside calibrated range [{low}, {high}]")]
    MaterialRange {
        temperature: f64,
        low: f64,
        high: f64,
    },

    #[error("unknown format tag: {0}")]
    UnknownFormatTag(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("tube is missing required field {0}")]
    MissingField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DamageError>;

impl DamageError {
    /// Shorthand used by the array-shape validators.
    pub(crate) fn shape(name: &'static str, expected: impl ToString, got: impl ToString) -> Self {
        DamageError::ShapeMismatch {
            name,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}
