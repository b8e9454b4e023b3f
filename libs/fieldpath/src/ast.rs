//! Segment AST for field-location expressions
//!
//! A field location is a chain of segments over the document tree:
//!
//! - `field` - object member access
//! - `[0]` - array index
//! - `[*]` - every element of an array
//! - `[?(@.key=='value')]` - the array elements whose (possibly dotted) key
//!   equals a string literal
//!
//! Paths are parsed once and reused; the original source string is kept so a
//! path can label validation messages verbatim.

use crate::error::Result;
use crate::parser::Parser;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a field-location expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member access: `doseQuantity`
    Field(String),

    /// Array index: `[0]`
    Index(usize),

    /// Every element of an array: `[*]`
    Wildcard,

    /// Filter on array elements: `[?(@.actor.type=='Organization')]`.
    /// The key may be dotted; matching compares against a string literal.
    Filter { key: Vec<String>, value: String },
}

/// A parsed field-location expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    source: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a field-location string into a segment AST.
    pub fn parse(input: &str) -> Result<FieldPath> {
        let segments = Parser::new(input).parse()?;
        Ok(FieldPath {
            source: input.to_string(),
            segments,
        })
    }

    /// The original location string, exactly as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First value the path resolves to, or `None` when absent.
    pub fn resolve_first<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        crate::resolver::resolve_first(root, self)
    }

    /// Every value the path resolves to, in document order.
    pub fn resolve_all<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        crate::resolver::resolve_all(root, self)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for FieldPath {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<FieldPath> {
        FieldPath::parse(s)
    }
}
