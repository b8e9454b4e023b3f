//! Mandation post-validation pass
//!
//! Whether a field must be present, may be present, or must be absent is a
//! function of the field *and* the vaccine type, with a few rules that also
//! depend on another field's value. The whole matrix lives in
//! [`mandation_of`], so the requiredness rules are auditable as data rather
//! than scattered across code paths.
//!
//! This pass runs only after structural validation has succeeded, so it may
//! assume well-typed values wherever it reads them.

use crate::fields::{Field, FieldTable};
use crate::vaccine::VaccineType;
use crate::validator::{IssueCode, ValidationIssue};
use immunis_fieldpath::Value;

/// Requiredness of one field for one vaccine type
#[derive(Debug, Clone, PartialEq)]
pub enum Mandation {
    /// Must be present
    Mandatory,
    /// Presence and absence are both accepted
    Optional,
    /// Must be absent
    NotApplicable,
    /// Mandatory when another field holds the given value, optional otherwise
    RequiredIfFieldEquals { field: Field, value: Value },
    /// Mandatory when another field is present, optional otherwise
    RequiredIfFieldPresent { field: Field },
}

/// The mandation matrix.
///
/// COVID19 carries the strictest row set; FLU shares its dosing and route
/// requirements; HPV, MMR and RSV accept the reduced set.
pub fn mandation_of(field: Field, vaccine_type: VaccineType) -> Mandation {
    use Field::*;
    use VaccineType::*;

    match field {
        // Mandatory for every vaccine type. occurrenceDateTime and status
        // are FHIR-mandatory upstream but carried here because the generic
        // FHIR shape layer is an external collaborator.
        OccurrenceDateTime
        | Status
        | PatientNameGiven
        | PatientNameFamily
        | PatientBirthDate
        | PatientGender
        | PatientAddressPostalCode
        | OrganizationIdentifierValue
        | OrganizationIdentifierSystem
        | IdentifierValue
        | IdentifierSystem
        | Recorded
        | PrimarySource
        | VaccinationProcedureCode
        | VaccineCodeCodingCode
        | NhsNumberVerificationStatusCode
        | LocationIdentifierValue
        | LocationIdentifierSystem => Mandation::Mandatory,

        // Supplier attestation: a non-primary source must say where the
        // record originated.
        ReportOriginText => Mandation::RequiredIfFieldEquals {
            field: PrimarySource,
            value: Value::Bool(false),
        },

        PractitionerIdentifierSystem => match vaccine_type {
            Covid19 | Flu => Mandation::RequiredIfFieldPresent {
                field: PractitionerIdentifierValue,
            },
            Hpv | Mmr | Rsv => Mandation::Optional,
        },

        DoseNumberPositiveInt | RouteCodingCode | DoseQuantityValue | DoseQuantityCode => {
            match vaccine_type {
                Covid19 | Flu => Mandation::Mandatory,
                Hpv | Mmr | Rsv => Mandation::Optional,
            }
        }

        ManufacturerDisplay | LotNumber | ExpirationDate => match vaccine_type {
            Covid19 => Mandation::Mandatory,
            Flu | Hpv | Mmr | Rsv => Mandation::Optional,
        },

        PatientIdentifierValue
        | OrganizationDisplay
        | PractitionerNameGiven
        | PractitionerNameFamily
        | PractitionerIdentifierValue
        | VaccinationProcedureDisplay
        | VaccineCodeCodingDisplay
        | SiteCodingCode
        | SiteCodingDisplay
        | RouteCodingDisplay
        | DoseQuantityUnit
        | ReasonCodeCodingCode
        | ReasonCodeCodingDisplay
        | NhsNumberVerificationStatusDisplay => Mandation::Optional,
    }
}

/// Enforce the matrix against the document for the classified vaccine type.
pub fn validate_mandation(
    document: &Value,
    vaccine_type: VaccineType,
    fields: &FieldTable,
    issues: &mut Vec<ValidationIssue>,
) {
    for &field in Field::ALL {
        let requirement = mandation_of(field, vaccine_type);
        enforce(field, requirement, document, vaccine_type, fields, issues);
    }
}

/// Enforce one field's requirement.
fn enforce(
    field: Field,
    requirement: Mandation,
    document: &Value,
    vaccine_type: VaccineType,
    fields: &FieldTable,
    issues: &mut Vec<ValidationIssue>,
) {
    let location = field.location();
    let present = fields.is_present(field, document);

    match requirement {
        Mandation::Mandatory => {
            if !present {
                issues.push(ValidationIssue::new(
                    IssueCode::Required,
                    location,
                    format!("{} is a mandatory field", location),
                ));
            }
        }
        Mandation::Optional => {}
        Mandation::NotApplicable => {
            if present {
                issues.push(ValidationIssue::new(
                    IssueCode::BusinessRule,
                    location,
                    format!("{} must not be present", location),
                ));
            }
        }
        Mandation::RequiredIfFieldEquals {
            field: governing,
            value,
        } => {
            let holds = fields.resolve(governing, document) == Some(&value);
            if holds && !present {
                issues.push(ValidationIssue::new(
                    IssueCode::Required,
                    location,
                    format!(
                        "{} is mandatory when {} is {}",
                        location,
                        governing.location(),
                        value
                    ),
                ));
            }
        }
        Mandation::RequiredIfFieldPresent { field: governing } => {
            if fields.is_present(governing, document) && !present {
                issues.push(ValidationIssue::new(
                    IssueCode::Required,
                    location,
                    format!(
                        "{} is mandatory when {} is present and vaccination type is {}",
                        location,
                        governing.location(),
                        vaccine_type
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_varies_by_vaccine_type() {
        assert_eq!(
            mandation_of(Field::DoseQuantityValue, VaccineType::Covid19),
            Mandation::Mandatory
        );
        assert_eq!(
            mandation_of(Field::DoseQuantityValue, VaccineType::Hpv),
            Mandation::Optional
        );
        assert_eq!(
            mandation_of(Field::LotNumber, VaccineType::Covid19),
            Mandation::Mandatory
        );
        assert_eq!(
            mandation_of(Field::LotNumber, VaccineType::Flu),
            Mandation::Optional
        );
    }

    #[test]
    fn test_report_origin_rule_depends_on_primary_source() {
        let rule = mandation_of(Field::ReportOriginText, VaccineType::Mmr);
        assert_eq!(
            rule,
            Mandation::RequiredIfFieldEquals {
                field: Field::PrimarySource,
                value: Value::Bool(false),
            }
        );
    }

    #[test]
    fn test_not_applicable_reports_presence() {
        // No current matrix row is unconditionally not-applicable, so drive
        // the arm through the per-field enforcement directly.
        let fields = FieldTable::compile().unwrap();
        let document = Value::from_json_str(r#"{"lotNumber": "AAJN11K"}"#).unwrap();

        let mut issues = Vec::new();
        enforce(
            Field::LotNumber,
            Mandation::NotApplicable,
            &document,
            VaccineType::Rsv,
            &fields,
            &mut issues,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "lotNumber must not be present");

        let absent = Value::from_json_str(r#"{}"#).unwrap();
        let mut issues = Vec::new();
        enforce(
            Field::LotNumber,
            Mandation::NotApplicable,
            &absent,
            VaccineType::Rsv,
            &fields,
            &mut issues,
        );
        assert!(issues.is_empty());
    }
}
