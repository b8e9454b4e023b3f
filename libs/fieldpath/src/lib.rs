//! Field-location expression engine for immunization documents
//!
//! This crate provides the document model and the addressing language used by
//! the immunization validators:
//!
//! 1. **Value** - a tagged tree (null, boolean, integer, exact decimal,
//!    string, array, object) built from JSON input
//! 2. **Parser** - turns a field-location string such as
//!    `contained[?(@.resourceType=='Patient')].name[0].given` into a
//!    pre-parsed segment AST
//! 3. **Resolver** - evaluates a parsed path against a borrowed value tree
//!
//! # Architecture Overview
//!
//! ```text
//! Location String
//!      |
//!   Parser -> FieldPath (segment AST)
//!      |
//! Resolver over &Value -> first match / all matches
//! ```
//!
//! Resolution never fails: a missing container, an index past the end of an
//! array, or a filter with no matching element all yield an empty result.
//! "Absent" is a first-class return value, not an error.

pub mod ast;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod value;

// Re-export main types
pub use ast::{FieldPath, Segment};
pub use error::{Error, Result};
pub use resolver::{resolve_all, resolve_first};
pub use value::{Map, Value};
