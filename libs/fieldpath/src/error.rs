//! Error types for the field-location engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Field-location parsing and document conversion errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Number out of range: {0}")]
    NumberOutOfRange(String),
}
