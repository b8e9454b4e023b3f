//! Error types for rule compilation
//!
//! Business-rule violations are never Rust errors; they are collected as
//! [`ValidationIssue`](crate::validator::ValidationIssue) values. The only
//! fallible operation is compiling the rule tables themselves, where a
//! malformed field-location literal is a defect in the engine rather than in
//! the data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid field location '{location}': {source}")]
    InvalidFieldLocation {
        location: String,
        #[source]
        source: immunis_fieldpath::Error,
    },
}
