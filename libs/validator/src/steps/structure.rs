//! Structural pre-validation pass
//!
//! An ordered battery of field-level rules over the raw document. Most rules
//! are declarative: a field location plus a primitive check, skipped silently
//! when the location does not resolve. A handful of cross-reference rules
//! (contained resources, internal references, target disease) are bespoke
//! functions; two of those are unconditional because the fields they guard
//! are structurally required.
//!
//! Every rule runs regardless of earlier failures. A single rule contributes
//! at most one issue; absence of an optional field contributes none.
//! Requiredness of everything else is the mandation pass's concern, not
//! this one's.

use crate::error::RuleError;
use crate::fields::Field;
use crate::primitives::{
    check_boolean, check_date, check_date_time, check_list, check_nhs_number, check_number,
    check_positive_integer, check_string, check_unique_by, quoted_list, ListRules, StringRules,
};
use crate::urls;
use crate::validator::{IssueCode, ValidationIssue};
use immunis_fieldpath::{FieldPath, Value};
use regex::Regex;
use std::sync::LazyLock;

pub const GENDERS: &[&str] = &["male", "female", "other", "unknown"];
pub const STATUSES: &[&str] = &["completed"];
const LOCATION_TYPES: &[&str] = &["Location"];

static ODS_CODE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9][A-Z][0-9][A-Z]$").expect("ODS code pattern"));

/// The primitive check a declarative rule applies to its resolved value
#[derive(Debug, Clone)]
enum Check {
    String(StringRules),
    List(ListRules),
    Date,
    DateTime,
    Boolean,
    PositiveInteger { max: i64 },
    Number { max_decimal_places: u32 },
    UniqueBy { key: &'static str, template: &'static str },
    /// 10-digit, space-free string plus the Modulus-11 checksum
    NhsNumber,
    /// Non-empty string in ODS alpha-digit-alpha-digit-alpha format
    OdsCode,
}

enum Rule {
    Field {
        path: FieldPath,
        location: &'static str,
        check: Check,
    },
    Custom(fn(&Value, &mut Vec<ValidationIssue>)),
}

/// The compiled pre-validation rule battery
pub struct StructureRules {
    rules: Vec<Rule>,
}

struct Battery {
    rules: Vec<Rule>,
}

impl Battery {
    fn field(&mut self, location: &'static str, check: Check) -> Result<(), RuleError> {
        let path = FieldPath::parse(location).map_err(|source| RuleError::InvalidFieldLocation {
            location: location.to_string(),
            source,
        })?;
        self.rules.push(Rule::Field {
            path,
            location,
            check,
        });
        Ok(())
    }

    fn custom(&mut self, rule: fn(&Value, &mut Vec<ValidationIssue>)) {
        self.rules.push(Rule::Custom(rule));
    }
}

fn string() -> Check {
    Check::String(StringRules::default())
}

fn singleton() -> Check {
    Check::List(ListRules {
        defined_length: Some(1),
        ..Default::default()
    })
}

fn singleton_of_strings() -> Check {
    Check::List(ListRules {
        defined_length: Some(1),
        elements_are_strings: true,
        ..Default::default()
    })
}

impl StructureRules {
    /// Parse every rule's field location up front and fix the execution
    /// order. Rule order is the order messages reach the supplier, so it is
    /// kept stable. A failure here is a defect in the rule definitions, not
    /// in any document.
    pub fn compile() -> Result<StructureRules, RuleError> {
        let mut battery = Battery { rules: Vec::new() };

        battery.custom(check_contained_contents);
        battery.custom(check_patient_reference);
        battery.field(
            "contained[?(@.resourceType=='Patient')].identifier",
            singleton(),
        )?;
        battery.field(Field::PatientIdentifierValue.location(), Check::NhsNumber)?;
        battery.field("contained[?(@.resourceType=='Patient')].name", singleton())?;
        battery.field(Field::PatientNameGiven.location(), singleton_of_strings())?;
        battery.field(Field::PatientNameFamily.location(), string())?;
        battery.field(Field::PatientBirthDate.location(), Check::Date)?;
        battery.field(
            Field::PatientGender.location(),
            Check::String(StringRules {
                allowed: Some(GENDERS),
                ..Default::default()
            }),
        )?;
        battery.field("contained[?(@.resourceType=='Patient')].address", singleton())?;
        battery.field(
            Field::PatientAddressPostalCode.location(),
            Check::String(StringRules {
                is_postal_code: true,
                ..Default::default()
            }),
        )?;
        battery.field(Field::OccurrenceDateTime.location(), Check::DateTime)?;
        battery.custom(check_performer_actor_types);
        battery.custom(check_performer_actor_references);
        battery.field(Field::OrganizationIdentifierValue.location(), Check::OdsCode)?;
        battery.field("identifier", singleton())?;
        battery.field(Field::IdentifierValue.location(), string())?;
        battery.field(Field::IdentifierSystem.location(), string())?;
        battery.field(
            Field::Status.location(),
            Check::String(StringRules {
                allowed: Some(STATUSES),
                ..Default::default()
            }),
        )?;
        battery.field("contained[?(@.resourceType=='Practitioner')].name", singleton())?;
        battery.field(
            Field::PractitionerNameGiven.location(),
            singleton_of_strings(),
        )?;
        battery.field(Field::PractitionerNameFamily.location(), string())?;
        battery.field(Field::Recorded.location(), Check::DateTime)?;
        battery.field(Field::PrimarySource.location(), Check::Boolean)?;
        battery.field(
            "extension",
            Check::UniqueBy {
                key: "url",
                template: "extension[?(@.url=='FIELD_TO_REPLACE')]",
            },
        )?;
        battery.custom(check_extension_codings);
        battery.field(Field::VaccinationProcedureCode.location(), string())?;
        battery.field(Field::VaccinationProcedureDisplay.location(), string())?;
        battery.field(
            "extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationSituation')].valueCodeableConcept.coding[?(@.system=='http://snomed.info/sct')].code",
            string(),
        )?;
        battery.field(
            "extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationSituation')].valueCodeableConcept.coding[?(@.system=='http://snomed.info/sct')].display",
            string(),
        )?;
        battery.field("protocolApplied", singleton())?;
        battery.field(
            Field::DoseNumberPositiveInt.location(),
            Check::PositiveInteger { max: 9 },
        )?;
        battery.field("protocolApplied[0].doseNumberString", string())?;
        battery.custom(check_target_disease);
        battery.custom(check_target_disease_codings);
        battery.custom(check_disease_type_coding_codes);
        battery.field(
            "vaccineCode.coding",
            Check::UniqueBy {
                key: "system",
                template: "vaccineCode.coding[?(@.system=='FIELD_TO_REPLACE')]",
            },
        )?;
        battery.field(Field::VaccineCodeCodingCode.location(), string())?;
        battery.field(Field::VaccineCodeCodingDisplay.location(), string())?;
        battery.field(Field::ManufacturerDisplay.location(), string())?;
        battery.field(
            Field::LotNumber.location(),
            Check::String(StringRules {
                max_length: Some(100),
                ..Default::default()
            }),
        )?;
        battery.field(Field::ExpirationDate.location(), Check::Date)?;
        battery.field(
            "site.coding",
            Check::UniqueBy {
                key: "system",
                template: "site.coding[?(@.system=='FIELD_TO_REPLACE')]",
            },
        )?;
        battery.field(Field::SiteCodingCode.location(), string())?;
        battery.field(Field::SiteCodingDisplay.location(), string())?;
        battery.field(
            "route.coding",
            Check::UniqueBy {
                key: "system",
                template: "route.coding[?(@.system=='FIELD_TO_REPLACE')]",
            },
        )?;
        battery.field(Field::RouteCodingCode.location(), string())?;
        battery.field(Field::RouteCodingDisplay.location(), string())?;
        battery.field(
            Field::DoseQuantityValue.location(),
            Check::Number {
                max_decimal_places: 4,
            },
        )?;
        battery.field(Field::DoseQuantityCode.location(), string())?;
        battery.field(Field::DoseQuantityUnit.location(), string())?;
        battery.custom(check_reason_code_codings);
        battery.custom(check_reason_code_coding_codes);
        battery.field(Field::OrganizationIdentifierSystem.location(), string())?;
        battery.field(Field::LocationIdentifierValue.location(), string())?;
        battery.field(Field::LocationIdentifierSystem.location(), string())?;
        battery.field(
            "location.type",
            Check::String(StringRules {
                allowed: Some(LOCATION_TYPES),
                ..Default::default()
            }),
        )?;

        Ok(StructureRules {
            rules: battery.rules,
        })
    }
}

/// Run the full battery, appending one issue per failed rule.
pub fn validate_structure(
    document: &Value,
    rules: &StructureRules,
    issues: &mut Vec<ValidationIssue>,
) {
    for rule in &rules.rules {
        match rule {
            Rule::Field {
                path,
                location,
                check,
            } => apply_field_rule(document, path, location, check, issues),
            Rule::Custom(custom) => custom(document, issues),
        }
    }
}

fn apply_field_rule(
    document: &Value,
    path: &FieldPath,
    location: &'static str,
    check: &Check,
    issues: &mut Vec<ValidationIssue>,
) {
    // Absent optional fields are not this pass's concern.
    let Some(value) = path.resolve_first(document) else {
        return;
    };

    let result = match check {
        Check::String(rules) => check_string(value, location, rules),
        Check::List(rules) => check_list(value, location, rules),
        Check::Date => check_date(value, location),
        Check::DateTime => check_date_time(value, location),
        Check::Boolean => check_boolean(value, location),
        Check::PositiveInteger { max } => check_positive_integer(value, location, Some(*max)),
        Check::Number { max_decimal_places } => check_number(value, location, *max_decimal_places),
        Check::UniqueBy { key, template } => match value.as_array() {
            Some(items) => check_unique_by(items, key, template),
            None => Err(ValidationIssue::new(
                IssueCode::Structure,
                location,
                format!("{} must be an array", location),
            )),
        },
        Check::NhsNumber => check_string(
            value,
            location,
            &StringRules {
                defined_length: Some(10),
                spaces_allowed: Some(false),
                ..Default::default()
            },
        )
        .and_then(|_| check_nhs_number(value, location)),
        Check::OdsCode => {
            check_string(value, location, &StringRules::default()).and_then(|_| {
                match value.as_str() {
                    Some(s) if ODS_CODE_FORMAT.is_match(s) => Ok(()),
                    _ => Err(ValidationIssue::new(
                        IssueCode::Value,
                        location,
                        format!(
                            "{} must be in expected format alpha-numeric-alpha-numeric-alpha \
                             (e.g X0X0X)",
                            location
                        ),
                    )),
                }
            })
        }
    };

    if let Err(issue) = result {
        issues.push(issue);
    }
}

fn contained_resources(document: &Value) -> &[Value] {
    document
        .get("contained")
        .and_then(Value::as_array)
        .unwrap_or(&[])
}

fn contained_resource<'a>(document: &'a Value, resource_type: &str) -> Option<&'a Value> {
    contained_resources(document).iter().find(|resource| {
        resource.get("resourceType").and_then(Value::as_str) == Some(resource_type)
    })
}

/// Unconditional: exactly one contained Patient, at most one Practitioner,
/// nothing else.
fn check_contained_contents(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let location = "contained";

    let Some(contained) = document.get("contained") else {
        issues.push(ValidationIssue::new(
            IssueCode::Required,
            location,
            format!("{} is a mandatory field", location),
        ));
        return;
    };

    let rules = ListRules {
        elements_are_objects: true,
        ..Default::default()
    };
    if let Err(issue) = check_list(contained, location, &rules) {
        issues.push(issue);
        return;
    }

    let resources = contained.as_array().unwrap_or(&[]);

    if resources
        .iter()
        .any(|resource| resource.get("resourceType").is_none())
    {
        issues.push(ValidationIssue::new(
            IssueCode::Structure,
            location,
            "contained resources must have 'resourceType' key".to_string(),
        ));
        return;
    }

    let type_count = |name: &str| {
        resources
            .iter()
            .filter(|r| r.get("resourceType").and_then(Value::as_str) == Some(name))
            .count()
    };
    let patient_count = type_count("Patient");
    let practitioner_count = type_count("Practitioner");
    let other_count = resources.len() - patient_count - practitioner_count;

    if other_count != 0 {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            "contained must contain only Patient and Practitioner resources".to_string(),
        ));
    }
    if patient_count != 1 {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            "contained must contain exactly one Patient resource".to_string(),
        ));
    }
    if practitioner_count > 1 {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            "contained must contain a maximum of one Practitioner resource".to_string(),
        ));
    }
}

/// `patient.reference` must be an internal reference matching the contained
/// Patient's id.
fn check_patient_reference(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let location = "patient.reference";

    let reference = document
        .get("patient")
        .and_then(|patient| patient.get("reference"))
        .and_then(Value::as_str);

    let Some(reference) = reference.filter(|r| r.starts_with('#')) else {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            "patient.reference must be a single reference to a contained Patient resource"
                .to_string(),
        ));
        return;
    };

    // A missing contained Patient is reported by the contained-contents rule.
    let Some(patient) = contained_resource(document, "Patient") else {
        return;
    };

    match patient.get("id").and_then(Value::as_str) {
        None => issues.push(ValidationIssue::new(
            IssueCode::Structure,
            location,
            "The contained Patient resource must have an 'id' field".to_string(),
        )),
        Some(id) if format!("#{}", id) != reference => issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            format!(
                "The reference '{}' does not exist in the contained Patient resource",
                reference
            ),
        )),
        Some(_) => {}
    }
}

/// At most one performer actor may carry the Organization type.
fn check_performer_actor_types(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let Some(performers) = document.get("performer").and_then(Value::as_array) else {
        return;
    };

    let organization_count = performers
        .iter()
        .filter(|performer| {
            performer
                .get("actor")
                .and_then(|actor| actor.get("type"))
                .and_then(Value::as_str)
                == Some("Organization")
        })
        .count();

    if organization_count > 1 {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            "performer",
            "performer.actor[?@.type=='Organization'] must be unique".to_string(),
        ));
    }
}

/// Internal performer references and the contained Practitioner must agree
/// in both directions.
fn check_performer_actor_references(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let location = "performer.actor.reference";

    let performers = document.get("performer").and_then(Value::as_array);
    let references: Vec<&str> = performers
        .into_iter()
        .flatten()
        .filter_map(|performer| {
            performer
                .get("actor")
                .and_then(|actor| actor.get("reference"))
                .and_then(Value::as_str)
        })
        .filter(|reference| reference.starts_with('#'))
        .collect();

    if references.len() > 1 {
        issues.push(ValidationIssue::new(
            IssueCode::Value,
            location,
            format!(
                "performer.actor.reference must be a single reference to a contained \
                 Practitioner resource. References found: {}",
                quoted_list(&references)
            ),
        ));
        return;
    }

    match contained_resource(document, "Practitioner") {
        Some(practitioner) => match practitioner.get("id").and_then(Value::as_str) {
            None => issues.push(ValidationIssue::new(
                IssueCode::Structure,
                location,
                "The contained Practitioner resource must have an 'id' field".to_string(),
            )),
            Some(id) => {
                if references.is_empty() {
                    issues.push(ValidationIssue::new(
                        IssueCode::Value,
                        location,
                        "contained Practitioner ID must be referenced by performer.actor.reference"
                            .to_string(),
                    ));
                } else if references[0] != format!("#{}", id) {
                    issues.push(ValidationIssue::new(
                        IssueCode::Value,
                        location,
                        format!(
                            "The reference '{}' does not exist in the contained Practitioner \
                             resources",
                            references[0]
                        ),
                    ));
                }
            }
        },
        None => {
            if !references.is_empty() {
                issues.push(ValidationIssue::new(
                    IssueCode::Value,
                    location,
                    format!(
                        "The reference(s) {} do not exist in the contained Practitioner resources",
                        quoted_list(&references)
                    ),
                ));
            }
        }
    }
}

/// Within each extension, coding systems must be unique.
fn check_extension_codings(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let Some(extensions) = document.get("extension").and_then(Value::as_array) else {
        return;
    };

    for extension in extensions {
        let Some(url) = extension.get("url").and_then(Value::as_str) else {
            continue;
        };
        let Some(codings) = extension
            .get("valueCodeableConcept")
            .and_then(|concept| concept.get("coding"))
            .and_then(Value::as_array)
        else {
            continue;
        };

        let template = format!(
            "extension[?(@.url=='{}')].valueCodeableConcept.coding[?(@.system=='FIELD_TO_REPLACE')]",
            url
        );
        if let Err(issue) = check_unique_by(codings, "system", &template) {
            issues.push(issue);
        }
    }
}

/// Unconditional: the target disease list must exist and every element must
/// carry a coding.
fn check_target_disease(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let location = "protocolApplied[0].targetDisease";

    let target_disease = document
        .get("protocolApplied")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|protocol| protocol.get("targetDisease"));

    let Some(target_disease) = target_disease else {
        issues.push(ValidationIssue::new(
            IssueCode::Required,
            location,
            format!("{} is a mandatory field", location),
        ));
        return;
    };

    let Some(elements) = target_disease.as_array() else {
        issues.push(ValidationIssue::new(
            IssueCode::Structure,
            location,
            format!("{} must be an array", location),
        ));
        return;
    };

    if elements
        .iter()
        .any(|element| element.get("coding").is_none())
    {
        issues.push(ValidationIssue::new(
            IssueCode::Structure,
            location,
            "Every element of protocolApplied[0].targetDisease must have 'coding' property"
                .to_string(),
        ));
    }
}

fn target_disease_elements(document: &Value) -> &[Value] {
    document
        .get("protocolApplied")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|protocol| protocol.get("targetDisease"))
        .and_then(Value::as_array)
        .unwrap_or(&[])
}

/// Each target disease coding must contain exactly one SNOMED entry.
fn check_target_disease_codings(document: &Value, issues: &mut Vec<ValidationIssue>) {
    for (index, element) in target_disease_elements(document).iter().enumerate() {
        let Some(codings) = element.get("coding").and_then(Value::as_array) else {
            continue;
        };

        let snomed_count = codings
            .iter()
            .filter(|coding| coding.get("system").and_then(Value::as_str) == Some(urls::SNOMED))
            .count();

        if snomed_count != 1 {
            let location = format!("protocolApplied[0].targetDisease[{}].coding", index);
            let message = format!(
                "{} must contain exactly one element with a system of {}",
                location,
                urls::SNOMED
            );
            issues.push(ValidationIssue::new(IssueCode::Value, location, message));
        }
    }
}

/// Each SNOMED target disease code, when present, must be a non-empty string.
fn check_disease_type_coding_codes(document: &Value, issues: &mut Vec<ValidationIssue>) {
    for (index, element) in target_disease_elements(document).iter().enumerate() {
        let snomed_coding = element
            .get("coding")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|coding| coding.get("system").and_then(Value::as_str) == Some(urls::SNOMED));

        let Some(code) = snomed_coding.and_then(|coding| coding.get("code")) else {
            continue;
        };

        let location = format!(
            "protocolApplied[0].targetDisease[{}].coding[?(@.system=='{}')].code",
            index,
            urls::SNOMED
        );
        if let Err(issue) = check_string(code, &location, &StringRules::default()) {
            issues.push(issue);
        }
    }
}

/// Each `reasonCode[i].coding`, when present, is a singleton list.
fn check_reason_code_codings(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let Some(reason_codes) = document.get("reasonCode").and_then(Value::as_array) else {
        return;
    };

    let rules = ListRules {
        defined_length: Some(1),
        ..Default::default()
    };
    for (index, reason) in reason_codes.iter().enumerate() {
        if let Some(coding) = reason.get("coding") {
            let location = format!("reasonCode[{}].coding", index);
            if let Err(issue) = check_list(coding, &location, &rules) {
                issues.push(issue);
            }
        }
    }
}

/// Each `reasonCode[i].coding[0].code`, when present, is a non-empty string.
fn check_reason_code_coding_codes(document: &Value, issues: &mut Vec<ValidationIssue>) {
    let Some(reason_codes) = document.get("reasonCode").and_then(Value::as_array) else {
        return;
    };

    for (index, reason) in reason_codes.iter().enumerate() {
        let code = reason
            .get("coding")
            .and_then(Value::as_array)
            .and_then(|codings| codings.first())
            .and_then(|coding| coding.get("code"));

        if let Some(code) = code {
            let location = format!("reasonCode[{}].coding[0].code", index);
            if let Err(issue) = check_string(code, &location, &StringRules::default()) {
                issues.push(issue);
            }
        }
    }
}
