//! Two-pass NHS immunization record validation engine
//!
//! Validates FHIR Immunization documents against the NHS-specific rules that
//! sit beyond generic FHIR schema validation, in two ordered passes:
//!
//! 1. **Structural pre-validation** - field-level shape checks (types,
//!    lengths, formats, enumerations, checksums, cross-references), each
//!    skipped silently when its field is absent
//! 2. **Mandation post-validation** - requiredness checks driven by the
//!    vaccine type classified from the target disease codes; a field may be
//!    mandatory, optional, forbidden, or conditionally required on another
//!    field's value
//!
//! Both passes collect every finding instead of failing fast, so a supplier
//! receives the complete picture in one round trip. The engine is pure and
//! synchronous: no I/O, no shared mutable state, and the borrowed document
//! is never modified.
//!
//! # Example
//!
//! ```ignore
//! use immunis_validator::{ImmunizationValidator, Value};
//!
//! let validator = ImmunizationValidator::new()?;
//! let document = Value::from_json_str(payload)?;
//! let outcome = validator.validate(&document);
//! if !outcome.is_valid() {
//!     eprintln!("{}", outcome.combined_message().unwrap());
//! }
//! ```

pub mod error;
pub mod fields;
pub mod primitives;
pub mod steps;
pub mod urls;
pub mod vaccine;
pub mod validator;

// Re-export main types
pub use error::RuleError;
pub use fields::{Field, FieldTable};
pub use steps::mandation::{mandation_of, Mandation};
pub use vaccine::{classify, ClassificationError, VaccineType};
pub use validator::{ImmunizationValidator, IssueCode, ValidationIssue, ValidationOutcome};

// The document model, re-exported for consumers
pub use immunis_fieldpath::{FieldPath, Value};
