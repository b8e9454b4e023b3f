//! End-to-end validation scenarios
//!
//! Complete immunization events are built per vaccine type, then degraded
//! one field at a time to check that each pass reports exactly the expected
//! findings.

use immunis_validator::{ImmunizationValidator, IssueCode, Value, VaccineType};
use serde_json::json;

fn validator() -> ImmunizationValidator {
    ImmunizationValidator::new().unwrap()
}

fn document(json: &serde_json::Value) -> Value {
    Value::from_json(json).unwrap()
}

fn target_disease(codes: &[(&str, &str)]) -> serde_json::Value {
    let elements: Vec<serde_json::Value> = codes
        .iter()
        .map(|(code, display)| {
            json!({"coding": [{"system": "http://snomed.info/sct", "code": code, "display": display}]})
        })
        .collect();
    json!(elements)
}

/// A complete COVID-19 immunization event satisfying every COVID-19
/// mandation row.
fn completed_covid19_event() -> serde_json::Value {
    json!({
        "resourceType": "Immunization",
        "contained": [
            {
                "resourceType": "Patient",
                "id": "Pat1",
                "identifier": [
                    {
                        "system": "https://fhir.nhs.uk/Id/nhs-number",
                        "value": "9990548609",
                        "extension": [
                            {
                                "url": "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus",
                                "valueCodeableConcept": {
                                    "coding": [
                                        {
                                            "system": "https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatusEngland",
                                            "code": "01",
                                            "display": "Number present and verified"
                                        }
                                    ]
                                }
                            }
                        ]
                    }
                ],
                "name": [{"family": "Taylor", "given": ["Sarah"]}],
                "gender": "female",
                "birthDate": "1990-01-01",
                "address": [{"postalCode": "LS1 4AP"}]
            }
        ],
        "extension": [
            {
                "url": "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationProcedure",
                "valueCodeableConcept": {
                    "coding": [
                        {
                            "system": "http://snomed.info/sct",
                            "code": "1324681000000101",
                            "display": "Administration of first dose of SARS-CoV-2 vaccine"
                        }
                    ]
                }
            }
        ],
        "identifier": [
            {
                "system": "https://supplierABC/identifiers/vacc",
                "value": "ACME-vacc123456"
            }
        ],
        "status": "completed",
        "vaccineCode": {
            "coding": [
                {
                    "system": "http://snomed.info/sct",
                    "code": "39114911000001105",
                    "display": "COVID-19 Vaccine Vaxzevria suspension for injection"
                }
            ]
        },
        "patient": {"reference": "#Pat1"},
        "occurrenceDateTime": "2023-06-01T10:00:00.000+00:00",
        "recorded": "2023-06-02T12:00:00+00:00",
        "primarySource": true,
        "manufacturer": {"display": "AstraZeneca Ltd"},
        "location": {
            "type": "Location",
            "identifier": {
                "value": "X99999",
                "system": "https://fhir.nhs.uk/Id/ods-organization-code"
            }
        },
        "lotNumber": "4120Z001",
        "expirationDate": "2023-12-31",
        "site": {
            "coding": [
                {"system": "http://snomed.info/sct", "code": "368208006", "display": "Left upper arm"}
            ]
        },
        "route": {
            "coding": [
                {"system": "http://snomed.info/sct", "code": "78421000", "display": "Intramuscular"}
            ]
        },
        "doseQuantity": {"value": 0.5, "code": "ml", "unit": "milliliter"},
        "performer": [
            {
                "actor": {
                    "type": "Organization",
                    "identifier": {
                        "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                        "value": "B0C4P"
                    }
                }
            }
        ],
        "protocolApplied": [
            {
                "targetDisease": target_disease(&[(
                    "840539006",
                    "Disease caused by severe acute respiratory syndrome coronavirus 2"
                )]),
                "doseNumberPositiveInt": 1
            }
        ]
    })
}

fn completed_event_for(vaccine_type: VaccineType) -> serde_json::Value {
    let mut event = completed_covid19_event();
    let diseases = match vaccine_type {
        VaccineType::Covid19 => return event,
        VaccineType::Flu => target_disease(&[("6142004", "Influenza")]),
        VaccineType::Hpv => target_disease(&[("240532009", "Human papillomavirus infection")]),
        VaccineType::Mmr => target_disease(&[
            ("14189004", "Measles"),
            ("36989005", "Mumps"),
            ("36653000", "Rubella"),
        ]),
        VaccineType::Rsv => target_disease(&[(
            "55735004",
            "Respiratory syncytial virus infection (disorder)",
        )]),
    };
    event["protocolApplied"][0]["targetDisease"] = diseases;
    event
}

fn with_contained_practitioner(mut event: serde_json::Value) -> serde_json::Value {
    event["contained"].as_array_mut().unwrap().push(json!({
        "resourceType": "Practitioner",
        "id": "Pract1",
        "identifier": [{"value": "7654321"}],
        "name": [{"family": "Nightingale", "given": ["Florence"]}]
    }));
    event["performer"]
        .as_array_mut()
        .unwrap()
        .push(json!({"actor": {"reference": "#Pract1"}}));
    event
}

#[test]
fn test_completed_events_pass_both_passes() {
    let validator = validator();

    for vaccine_type in [
        VaccineType::Covid19,
        VaccineType::Flu,
        VaccineType::Hpv,
        VaccineType::Mmr,
        VaccineType::Rsv,
    ] {
        let outcome = validator.validate(&document(&completed_event_for(vaccine_type)));
        assert!(
            outcome.is_valid(),
            "{} event unexpectedly invalid: {:?}",
            vaccine_type,
            outcome.combined_message()
        );
        assert_eq!(outcome.vaccine_type, Some(vaccine_type));
        assert!(outcome.issues.is_empty());
    }
}

#[test]
fn test_missing_lot_number_is_the_only_finding_for_covid19() {
    let mut event = completed_covid19_event();
    event.as_object_mut().unwrap().remove("lotNumber");

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::Required);
    assert_eq!(outcome.issues[0].location, "lotNumber");
    assert_eq!(outcome.issues[0].message, "lotNumber is a mandatory field");
}

#[test]
fn test_lot_number_is_optional_for_flu() {
    let mut event = completed_event_for(VaccineType::Flu);
    event.as_object_mut().unwrap().remove("lotNumber");

    let outcome = validator().validate(&document(&event));
    assert!(outcome.is_valid(), "{:?}", outcome.combined_message());
}

#[test]
fn test_covid19_only_fields_each_report_once() {
    let validator = validator();

    for field in ["lotNumber", "expirationDate", "manufacturer"] {
        let mut event = completed_covid19_event();
        event.as_object_mut().unwrap().remove(field);

        let outcome = validator.validate(&document(&event));
        assert!(!outcome.is_valid());
        assert_eq!(outcome.issues.len(), 1, "removing {}", field);
        assert!(outcome.issues[0].message.contains("is a mandatory field"));
    }
}

#[test]
fn test_dose_quantity_value_mandation_varies_by_vaccine_type() {
    let validator = validator();

    let mut covid = completed_covid19_event();
    covid["doseQuantity"].as_object_mut().unwrap().remove("value");
    let outcome = validator.validate(&document(&covid));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(
        outcome.issues[0].message,
        "doseQuantity.value is a mandatory field"
    );

    let mut hpv = completed_event_for(VaccineType::Hpv);
    hpv["doseQuantity"].as_object_mut().unwrap().remove("value");
    let outcome = validator.validate(&document(&hpv));
    assert!(outcome.is_valid(), "{:?}", outcome.combined_message());
}

#[test]
fn test_duplicate_patient_halts_before_mandation() {
    let mut event = completed_covid19_event();
    let patient = event["contained"][0].clone();
    event["contained"].as_array_mut().unwrap().push(patient);

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.vaccine_type, None);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(
        outcome.issues[0].message,
        "contained must contain exactly one Patient resource"
    );
    // Structural failure means no mandation findings at all.
    assert!(outcome
        .issues
        .iter()
        .all(|issue| !issue.message.contains("mandatory field")));
}

#[test]
fn test_unknown_disease_code_is_a_single_decisive_finding() {
    let mut event = completed_covid19_event();
    event["protocolApplied"][0]["targetDisease"] =
        target_disease(&[("INVALID_VALUE", "Unknown")]);

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.vaccine_type, None);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::CodeInvalid);
    assert_eq!(
        outcome.issues[0].message,
        "['INVALID_VALUE'] is not a valid combination of disease codes for this service"
    );
}

#[test]
fn test_report_origin_text_is_required_when_primary_source_is_false() {
    let validator = validator();

    let mut event = completed_covid19_event();
    event["primarySource"] = json!(false);
    let outcome = validator.validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(
        outcome.issues[0].message,
        "reportOrigin.text is mandatory when primarySource is false"
    );

    event["reportOrigin"] = json!({"text": "Record keeper ABC"});
    let outcome = validator.validate(&document(&event));
    assert!(outcome.is_valid(), "{:?}", outcome.combined_message());
}

#[test]
fn test_report_origin_text_is_not_required_when_primary_source_is_true() {
    let event = completed_covid19_event();
    assert_eq!(event["primarySource"], json!(true));
    let outcome = validator().validate(&document(&event));
    assert!(outcome.is_valid());
}

#[test]
fn test_practitioner_identifier_system_depends_on_value_and_vaccine_type() {
    let validator = validator();

    // COVID-19: identifier.value present without identifier.system fails
    let event = with_contained_practitioner(completed_covid19_event());
    let outcome = validator.validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(
        outcome.issues[0].message,
        "contained[?(@.resourceType=='Practitioner')].identifier[0].system is mandatory when \
         contained[?(@.resourceType=='Practitioner')].identifier[0].value is present and \
         vaccination type is COVID19"
    );

    // Adding the system satisfies the rule
    let mut event = with_contained_practitioner(completed_covid19_event());
    event["contained"][1]["identifier"][0]["system"] =
        json!("https://fhir.hl7.org.uk/Id/nmc-number");
    let outcome = validator.validate(&document(&event));
    assert!(outcome.is_valid(), "{:?}", outcome.combined_message());

    // HPV: the same document without the system is accepted
    let event = with_contained_practitioner(completed_event_for(VaccineType::Hpv));
    let outcome = validator.validate(&document(&event));
    assert!(outcome.is_valid(), "{:?}", outcome.combined_message());
}

#[test]
fn test_structural_findings_are_all_collected() {
    let mut event = completed_covid19_event();
    event["contained"][0]["gender"] = json!("F");
    event["contained"][0]["address"][0]["postalCode"] = json!("LS14AP");

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(outcome.vaccine_type, None);
    assert_eq!(outcome.issues.len(), 2);
    assert_eq!(
        outcome.issues[0].message,
        "contained[?(@.resourceType=='Patient')].gender must be one of the following: \
         male, female, other, unknown"
    );
    assert!(outcome.issues[1]
        .message
        .contains("must contain a single space"));
}

#[test]
fn test_combined_message_joins_in_execution_order() {
    let mut event = completed_covid19_event();
    event.as_object_mut().unwrap().remove("lotNumber");
    event.as_object_mut().unwrap().remove("expirationDate");

    let outcome = validator().validate(&document(&event));
    assert_eq!(
        outcome.combined_message().unwrap(),
        "Validation errors: lotNumber is a mandatory field; \
         expirationDate is a mandatory field"
    );
}

#[test]
fn test_validation_is_idempotent() {
    let validator = validator();
    let event = document(&completed_covid19_event());

    let first = validator.validate(&event);
    let second = validator.validate(&event);
    assert_eq!(first, second);

    let mut broken = completed_covid19_event();
    broken.as_object_mut().unwrap().remove("lotNumber");
    let broken = document(&broken);
    assert_eq!(validator.validate(&broken), validator.validate(&broken));
}

#[test]
fn test_validate_batch() {
    let validator = validator();

    let valid = document(&completed_covid19_event());
    let mut invalid_event = completed_covid19_event();
    invalid_event.as_object_mut().unwrap().remove("lotNumber");
    let invalid = document(&invalid_event);

    let outcomes = validator.validate_batch(&[valid, invalid]);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_valid());
    assert!(!outcomes[1].is_valid());
}

#[test]
fn test_practitioner_reference_integrity_both_directions() {
    let validator = validator();

    // Practitioner contained but never referenced
    let mut event = with_contained_practitioner(completed_covid19_event());
    event["performer"].as_array_mut().unwrap().pop();
    let outcome = validator.validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(
        outcome.issues[0].message,
        "contained Practitioner ID must be referenced by performer.actor.reference"
    );

    // Reference without a contained Practitioner
    let mut event = completed_covid19_event();
    event["performer"]
        .as_array_mut()
        .unwrap()
        .push(json!({"actor": {"reference": "#Pract1"}}));
    let outcome = validator.validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(
        outcome.issues[0].message,
        "The reference(s) ['#Pract1'] do not exist in the contained Practitioner resources"
    );
}

#[test]
fn test_patient_reference_must_match_contained_patient() {
    let mut event = completed_covid19_event();
    event["patient"]["reference"] = json!("#somebody-else");

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(
        outcome.issues[0].message,
        "The reference '#somebody-else' does not exist in the contained Patient resource"
    );
}

#[test]
fn test_duplicate_extension_url_substitutes_placeholder() {
    let mut event = completed_covid19_event();
    let extension = event["extension"][0].clone();
    event["extension"].as_array_mut().unwrap().push(extension);

    let outcome = validator().validate(&document(&event));
    assert!(!outcome.is_valid());
    assert!(outcome.issues.iter().any(|issue| issue.message
        == "extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/\
            Extension-UKCore-VaccinationProcedure')] must be unique"));
}

#[test]
fn test_dose_quantity_precision_is_checked_exactly() {
    let validator = validator();

    let mut event = completed_covid19_event();
    event["doseQuantity"]["value"] = json!(0.00001);
    let outcome = validator.validate(&document(&event));
    assert!(!outcome.is_valid());
    assert_eq!(
        outcome.issues[0].message,
        "doseQuantity.value must be a number with a maximum of 4 decimal places"
    );
}
