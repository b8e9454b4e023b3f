//! Resolution of parsed field locations against a document tree
//!
//! Resolution is a pure read. Each segment maps the current node set to the
//! next one; any shape mismatch (member access on an array, an index past
//! the end, a filter over a non-array) simply contributes nothing. An empty
//! final node set means the field is absent.
//!
//! Filters keep every matching element, in document order. The callers that
//! historically took "the first matching element" use [`resolve_first`].

use crate::ast::{FieldPath, Segment};
use crate::value::Value;

/// Resolve a path to its first match, or `None` when the field is absent.
pub fn resolve_first<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    resolve_all(root, path).into_iter().next()
}

/// Resolve a path to every match, in document order.
pub fn resolve_all<'a>(root: &'a Value, path: &FieldPath) -> Vec<&'a Value> {
    let mut nodes = vec![root];

    for segment in path.segments() {
        let mut next = Vec::new();

        for node in nodes {
            match segment {
                Segment::Field(name) => {
                    if let Some(child) = node.get(name) {
                        next.push(child);
                    }
                }
                Segment::Index(index) => {
                    if let Some(child) = node.as_array().and_then(|items| items.get(*index)) {
                        next.push(child);
                    }
                }
                Segment::Wildcard => {
                    if let Some(items) = node.as_array() {
                        next.extend(items.iter());
                    }
                }
                Segment::Filter { key, value } => {
                    if let Some(items) = node.as_array() {
                        next.extend(items.iter().filter(|item| filter_matches(item, key, value)));
                    }
                }
            }
        }

        if next.is_empty() {
            return next;
        }
        nodes = next;
    }

    nodes
}

/// Does `item.key == value`, walking a dotted key? Missing keys never match.
fn filter_matches(item: &Value, key: &[String], expected: &str) -> bool {
    let mut current = item;
    for part in key {
        match current.get(part) {
            Some(child) => current = child,
            None => return false,
        }
    }
    current.as_str() == Some(expected)
}
