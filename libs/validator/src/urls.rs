//! Canonical URLs expected within the FHIR immunization resource

pub const SNOMED: &str = "http://snomed.info/sct";

pub const NHS_NUMBER: &str = "https://fhir.nhs.uk/Id/nhs-number";

pub const VACCINATION_PROCEDURE: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationProcedure";

pub const VACCINATION_SITUATION: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationSituation";

pub const NHS_NUMBER_VERIFICATION_STATUS: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus";

pub const NHS_NUMBER_VERIFICATION_STATUS_SYSTEM: &str =
    "https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatusEngland";

pub const ODS_ORGANIZATION_CODE: &str = "https://fhir.nhs.uk/Id/ods-organization-code";
