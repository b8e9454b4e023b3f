//! Document value tree
//!
//! An immunization document is an ordered tree of objects and arrays with
//! scalar leaves. Numbers are split into integers and exact decimals: the
//! JSON source is parsed with `serde_json`'s `arbitrary_precision` feature,
//! so a literal like `0.5000` keeps its textual scale when converted into a
//! [`rust_decimal::Decimal`]. This is what makes decimal-place validation
//! meaningful downstream.
//!
//! The tree is read-only as far as the validators are concerned; they borrow
//! it for the duration of one validation run and never mutate it.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Object representation. Key order is not significant for validation.
pub type Map = BTreeMap<String, Value>;

/// A node in the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Parse a JSON string into a value tree.
    pub fn from_json_str(input: &str) -> Result<Value> {
        let json: serde_json::Value =
            serde_json::from_str(input).map_err(|e| Error::InvalidDocument(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Convert an already-parsed `serde_json` value into a value tree.
    ///
    /// Numbers that fit an `i64` become [`Value::Integer`]; everything else
    /// is converted through its textual form into an exact decimal. A number
    /// too large for `Decimal`'s 96-bit mantissa is rejected rather than
    /// silently rounded.
    pub fn from_json(json: &serde_json::Value) -> Result<Value> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::Integer(i));
                }
                let literal = n.to_string();
                Decimal::from_str(&literal)
                    .or_else(|_| Decimal::from_scientific(&literal))
                    .map(Value::Decimal)
                    .map_err(|_| Error::NumberOutOfRange(literal))
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Array(items) => {
                let mut converted = Vec::with_capacity(items.len());
                for item in items {
                    converted.push(Self::from_json(item)?);
                }
                Ok(Value::Array(converted))
            }
            serde_json::Value::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), Self::from_json(value)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to decimals, decimals pass through.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Object member lookup. Non-objects and missing keys yield `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Human-readable name of the value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    /// Diagnostic rendering: scalars print bare (strings unquoted, booleans
    /// as `true`/`false`), containers in compact JSON-like form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
