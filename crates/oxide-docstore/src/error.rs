//! Error types for the document store.

use thiserror::Error;

/// Document store errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A string is not a 24-character hex object id.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// No document matched.
    #[error("document not found")]
    NotFound,

    /// A strict model was given a field outside its schema.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A required field is absent or was asked to be removed.
    #[error("field is required: {0}")]
    RequiredField(String),

    /// A field value does not match its declared kind.
    #[error("field {field} must be {expected}")]
    WrongKind {
        field: String,
        expected: &'static str,
    },

    /// A query could not be evaluated.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
