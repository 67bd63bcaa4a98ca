//! Error types shared by the extractors and the reconciliation engine.

use thiserror::Error;

/// Result of extracting a single field from a raw document.
pub type FieldResult<T> = Result<T, FieldError>;

/// A structural assumption about a raw document that did not hold.
///
/// Field errors never abort a record: the caller degrades them to the
/// field's default value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("missing key: {0}")]
    Missing(String),

    #[error("unexpected shape at {path}: expected {expected}")]
    WrongShape { path: String, expected: &'static str },

    #[error("expected exactly one value at {path}, found {count}")]
    Ambiguous { path: String, count: usize },

    #[error("no value matched at {0}")]
    NoMatch(String),

    #[error("unsupported date precision {0}")]
    UnsupportedPrecision(i64),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// A field descriptor was applied to a value of the wrong kind.
///
/// This can only happen when descriptor tables are inconsistent, and is
/// fatal for the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("field {field}: expected a {expected} value, got {found}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
