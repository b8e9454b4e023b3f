//! Immunization validator - owns the compiled rule tables
//!
//! The two passes run in a fixed order: structural shape first, then
//! mandation. Mandation depends on the vaccine type, and the vaccine type
//! can only be classified from a structurally well-formed document, so a
//! structural failure ends the run - reporting requiredness findings against
//! a malformed document would only confuse the supplier.

use crate::error::RuleError;
use crate::fields::FieldTable;
use crate::steps::mandation::validate_mandation;
use crate::steps::structure::{validate_structure, StructureRules};
use crate::vaccine::{classify, VaccineType, TARGET_DISEASE_CODES_LOCATION};
use immunis_fieldpath::Value;
use serde_json::json;

/// Reusable validator - compiles the rule tables once, validates many times
pub struct ImmunizationValidator {
    structure: StructureRules,
    fields: FieldTable,
}

impl ImmunizationValidator {
    /// Compile the structural battery and the mandation field table.
    ///
    /// Fails only when a rule definition itself is malformed, which is a
    /// defect in the engine rather than a property of any document.
    pub fn new() -> Result<Self, RuleError> {
        Ok(Self {
            structure: StructureRules::compile()?,
            fields: FieldTable::compile()?,
        })
    }

    /// Validate one document. Never fails; all findings are carried in the
    /// returned outcome.
    pub fn validate(&self, document: &Value) -> ValidationOutcome {
        ValidationRun::new(self, document).execute()
    }

    pub fn validate_batch(&self, documents: &[Value]) -> Vec<ValidationOutcome> {
        documents.iter().map(|d| self.validate(d)).collect()
    }
}

/// Short-lived validation execution
struct ValidationRun<'a> {
    validator: &'a ImmunizationValidator,
    document: &'a Value,
    issues: Vec<ValidationIssue>,
}

impl<'a> ValidationRun<'a> {
    fn new(validator: &'a ImmunizationValidator, document: &'a Value) -> Self {
        Self {
            validator,
            document,
            issues: Vec::new(),
        }
    }

    fn execute(mut self) -> ValidationOutcome {
        validate_structure(self.document, &self.validator.structure, &mut self.issues);

        if !self.issues.is_empty() {
            tracing::debug!(
                issue_count = self.issues.len(),
                "structural validation failed; mandation pass skipped"
            );
            return self.outcome(None);
        }

        match classify(self.document) {
            Ok(vaccine_type) => {
                validate_mandation(
                    self.document,
                    vaccine_type,
                    &self.validator.fields,
                    &mut self.issues,
                );
                self.outcome(Some(vaccine_type))
            }
            Err(error) => {
                // Mandation rules cannot be evaluated without a vaccine
                // type, so this single finding ends the pass.
                self.issues.push(ValidationIssue::new(
                    IssueCode::CodeInvalid,
                    TARGET_DISEASE_CODES_LOCATION,
                    error.to_string(),
                ));
                self.outcome(None)
            }
        }
    }

    fn outcome(self, vaccine_type: Option<VaccineType>) -> ValidationOutcome {
        ValidationOutcome {
            vaccine_type,
            valid: self.issues.is_empty(),
            issues: self.issues,
        }
    }
}

/// Validation result for a single document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Classified vaccine type; `None` when the run ended before
    /// classification succeeded
    pub vaccine_type: Option<VaccineType>,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The legacy combined message: `Validation errors: ` followed by every
    /// finding joined with `; ` in rule-execution order. `None` when valid.
    pub fn combined_message(&self) -> Option<String> {
        if self.issues.is_empty() {
            return None;
        }
        let joined: Vec<&str> = self.issues.iter().map(|i| i.message.as_str()).collect();
        Some(format!("Validation errors: {}", joined.join("; ")))
    }

    /// Render as an OperationOutcome-shaped JSON body for the HTTP layer.
    pub fn to_operation_outcome(&self) -> serde_json::Value {
        json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(|i| i.to_json()).collect::<Vec<_>>(),
        })
    }
}

/// Individual validation finding
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub code: IssueCode,
    /// The field location the finding is anchored to
    pub location: String,
    /// The full supplier-facing message
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        code: IssueCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            location: location.into(),
            message: message.into(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "severity": "error",
            "code": self.code.to_string(),
            "diagnostics": self.message,
            "expression": [self.location],
        })
    }
}

/// Finding category, aligned with the FHIR issue-type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    /// Wrong shape: a value of the wrong type, or a malformed container
    Structure,
    /// Right shape, disallowed content: length, format, enumeration,
    /// checksum, uniqueness
    Value,
    /// A mandatory field is missing
    Required,
    /// A field is present that the rules forbid
    BusinessRule,
    /// The disease-code combination is not recognized
    CodeInvalid,
    /// An engine-level fault folded into the findings
    Processing,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Structure => "structure",
            Self::Value => "value",
            Self::Required => "required",
            Self::BusinessRule => "business-rule",
            Self::CodeInvalid => "code-invalid",
            Self::Processing => "processing",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_message_format() {
        let outcome = ValidationOutcome {
            vaccine_type: None,
            valid: false,
            issues: vec![
                ValidationIssue::new(
                    IssueCode::Value,
                    "lotNumber",
                    "lotNumber must be a non-empty string",
                ),
                ValidationIssue::new(
                    IssueCode::Required,
                    "recorded",
                    "recorded is a mandatory field",
                ),
            ],
        };

        assert_eq!(
            outcome.combined_message().unwrap(),
            "Validation errors: lotNumber must be a non-empty string; \
             recorded is a mandatory field"
        );
    }

    #[test]
    fn test_combined_message_is_none_when_valid() {
        let outcome = ValidationOutcome {
            vaccine_type: Some(VaccineType::Covid19),
            valid: true,
            issues: Vec::new(),
        };
        assert!(outcome.is_valid());
        assert_eq!(outcome.combined_message(), None);
    }

    #[test]
    fn test_operation_outcome_conversion() {
        let outcome = ValidationOutcome {
            vaccine_type: None,
            valid: false,
            issues: vec![ValidationIssue::new(
                IssueCode::Required,
                "lotNumber",
                "lotNumber is a mandatory field",
            )],
        };

        let body = outcome.to_operation_outcome();
        assert_eq!(body["resourceType"], "OperationOutcome");
        assert_eq!(body["issue"][0]["severity"], "error");
        assert_eq!(body["issue"][0]["code"], "required");
        assert_eq!(body["issue"][0]["diagnostics"], "lotNumber is a mandatory field");
        assert_eq!(body["issue"][0]["expression"][0], "lotNumber");
    }
}
