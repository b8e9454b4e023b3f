//! Field identifiers and their locations within the immunization resource
//!
//! Every field that participates in the mandation pass is named here, with
//! the location string used both to resolve the value and to label error
//! messages. Locations are parsed once into a [`FieldTable`] when the
//! validator is constructed.

use crate::error::RuleError;
use immunis_fieldpath::{FieldPath, Value};
use std::collections::HashMap;

/// A field governed by the mandation matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OccurrenceDateTime,
    Status,
    PatientIdentifierValue,
    PatientNameGiven,
    PatientNameFamily,
    PatientBirthDate,
    PatientGender,
    PatientAddressPostalCode,
    OrganizationIdentifierValue,
    OrganizationIdentifierSystem,
    OrganizationDisplay,
    IdentifierValue,
    IdentifierSystem,
    PractitionerNameGiven,
    PractitionerNameFamily,
    PractitionerIdentifierValue,
    PractitionerIdentifierSystem,
    Recorded,
    PrimarySource,
    ReportOriginText,
    VaccinationProcedureCode,
    VaccinationProcedureDisplay,
    DoseNumberPositiveInt,
    VaccineCodeCodingCode,
    VaccineCodeCodingDisplay,
    ManufacturerDisplay,
    LotNumber,
    ExpirationDate,
    SiteCodingCode,
    SiteCodingDisplay,
    RouteCodingCode,
    RouteCodingDisplay,
    DoseQuantityValue,
    DoseQuantityCode,
    DoseQuantityUnit,
    ReasonCodeCodingCode,
    ReasonCodeCodingDisplay,
    NhsNumberVerificationStatusCode,
    NhsNumberVerificationStatusDisplay,
    LocationIdentifierValue,
    LocationIdentifierSystem,
}

impl Field {
    /// Every field, in the order mandation findings are reported.
    pub const ALL: &'static [Field] = &[
        Field::OccurrenceDateTime,
        Field::Status,
        Field::PatientIdentifierValue,
        Field::PatientNameGiven,
        Field::PatientNameFamily,
        Field::PatientBirthDate,
        Field::PatientGender,
        Field::PatientAddressPostalCode,
        Field::OrganizationIdentifierValue,
        Field::OrganizationIdentifierSystem,
        Field::OrganizationDisplay,
        Field::IdentifierValue,
        Field::IdentifierSystem,
        Field::PractitionerNameGiven,
        Field::PractitionerNameFamily,
        Field::PractitionerIdentifierValue,
        Field::PractitionerIdentifierSystem,
        Field::Recorded,
        Field::PrimarySource,
        Field::ReportOriginText,
        Field::VaccinationProcedureCode,
        Field::VaccinationProcedureDisplay,
        Field::DoseNumberPositiveInt,
        Field::VaccineCodeCodingCode,
        Field::VaccineCodeCodingDisplay,
        Field::ManufacturerDisplay,
        Field::LotNumber,
        Field::ExpirationDate,
        Field::SiteCodingCode,
        Field::SiteCodingDisplay,
        Field::RouteCodingCode,
        Field::RouteCodingDisplay,
        Field::DoseQuantityValue,
        Field::DoseQuantityCode,
        Field::DoseQuantityUnit,
        Field::ReasonCodeCodingCode,
        Field::ReasonCodeCodingDisplay,
        Field::NhsNumberVerificationStatusCode,
        Field::NhsNumberVerificationStatusDisplay,
        Field::LocationIdentifierValue,
        Field::LocationIdentifierSystem,
    ];

    /// The field's location string, exactly as it appears in error messages.
    pub fn location(self) -> &'static str {
        match self {
            Field::OccurrenceDateTime => "occurrenceDateTime",
            Field::Status => "status",
            Field::PatientIdentifierValue => {
                "contained[?(@.resourceType=='Patient')].identifier[0].value"
            }
            Field::PatientNameGiven => "contained[?(@.resourceType=='Patient')].name[0].given",
            Field::PatientNameFamily => "contained[?(@.resourceType=='Patient')].name[0].family",
            Field::PatientBirthDate => "contained[?(@.resourceType=='Patient')].birthDate",
            Field::PatientGender => "contained[?(@.resourceType=='Patient')].gender",
            Field::PatientAddressPostalCode => {
                "contained[?(@.resourceType=='Patient')].address[0].postalCode"
            }
            Field::OrganizationIdentifierValue => {
                "performer[?(@.actor.type=='Organization')].actor.identifier.value"
            }
            Field::OrganizationIdentifierSystem => {
                "performer[?(@.actor.type=='Organization')].actor.identifier.system"
            }
            Field::OrganizationDisplay => "performer[?(@.actor.type=='Organization')].actor.display",
            Field::IdentifierValue => "identifier[0].value",
            Field::IdentifierSystem => "identifier[0].system",
            Field::PractitionerNameGiven => {
                "contained[?(@.resourceType=='Practitioner')].name[0].given"
            }
            Field::PractitionerNameFamily => {
                "contained[?(@.resourceType=='Practitioner')].name[0].family"
            }
            Field::PractitionerIdentifierValue => {
                "contained[?(@.resourceType=='Practitioner')].identifier[0].value"
            }
            Field::PractitionerIdentifierSystem => {
                "contained[?(@.resourceType=='Practitioner')].identifier[0].system"
            }
            Field::Recorded => "recorded",
            Field::PrimarySource => "primarySource",
            Field::ReportOriginText => "reportOrigin.text",
            Field::VaccinationProcedureCode => {
                "extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationProcedure')].valueCodeableConcept.coding[?(@.system=='http://snomed.info/sct')].code"
            }
            Field::VaccinationProcedureDisplay => {
                "extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationProcedure')].valueCodeableConcept.coding[?(@.system=='http://snomed.info/sct')].display"
            }
            Field::DoseNumberPositiveInt => "protocolApplied[0].doseNumberPositiveInt",
            Field::VaccineCodeCodingCode => {
                "vaccineCode.coding[?(@.system=='http://snomed.info/sct')].code"
            }
            Field::VaccineCodeCodingDisplay => {
                "vaccineCode.coding[?(@.system=='http://snomed.info/sct')].display"
            }
            Field::ManufacturerDisplay => "manufacturer.display",
            Field::LotNumber => "lotNumber",
            Field::ExpirationDate => "expirationDate",
            Field::SiteCodingCode => "site.coding[?(@.system=='http://snomed.info/sct')].code",
            Field::SiteCodingDisplay => "site.coding[?(@.system=='http://snomed.info/sct')].display",
            Field::RouteCodingCode => "route.coding[?(@.system=='http://snomed.info/sct')].code",
            Field::RouteCodingDisplay => {
                "route.coding[?(@.system=='http://snomed.info/sct')].display"
            }
            Field::DoseQuantityValue => "doseQuantity.value",
            Field::DoseQuantityCode => "doseQuantity.code",
            Field::DoseQuantityUnit => "doseQuantity.unit",
            Field::ReasonCodeCodingCode => "reasonCode[0].coding[0].code",
            Field::ReasonCodeCodingDisplay => "reasonCode[0].coding[0].display",
            Field::NhsNumberVerificationStatusCode => {
                "contained[?(@.resourceType=='Patient')].identifier[?(@.system=='https://fhir.nhs.uk/Id/nhs-number')].extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus')].valueCodeableConcept.coding[?(@.system=='https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatusEngland')].code"
            }
            Field::NhsNumberVerificationStatusDisplay => {
                "contained[?(@.resourceType=='Patient')].identifier[?(@.system=='https://fhir.nhs.uk/Id/nhs-number')].extension[?(@.url=='https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus')].valueCodeableConcept.coding[?(@.system=='https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatusEngland')].display"
            }
            Field::LocationIdentifierValue => "location.identifier.value",
            Field::LocationIdentifierSystem => "location.identifier.system",
        }
    }
}

/// Field locations compiled to parsed paths, built once per validator
#[derive(Debug)]
pub struct FieldTable {
    paths: HashMap<Field, FieldPath>,
}

impl FieldTable {
    pub fn compile() -> Result<FieldTable, RuleError> {
        let mut paths = HashMap::with_capacity(Field::ALL.len());

        for &field in Field::ALL {
            let location = field.location();
            let path = FieldPath::parse(location).map_err(|source| {
                RuleError::InvalidFieldLocation {
                    location: location.to_string(),
                    source,
                }
            })?;
            paths.insert(field, path);
        }

        Ok(FieldTable { paths })
    }

    /// Resolve a field to its first value in the document.
    pub fn resolve<'a>(&self, field: Field, document: &'a Value) -> Option<&'a Value> {
        self.paths
            .get(&field)
            .and_then(|path| path.resolve_first(document))
    }

    /// Presence for mandation purposes: resolvable and not an explicit null.
    pub fn is_present(&self, field: Field, document: &Value) -> bool {
        self.resolve(field, document).is_some_and(|v| !v.is_null())
    }
}
