//! The two validation passes
//!
//! Structural shape checks run first; requiredness (mandation) checks run
//! second, and only when the document's shape is well-formed.

pub mod mandation;
pub mod structure;
