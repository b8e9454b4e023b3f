//! Vaccine type classification from target disease codes
//!
//! The SNOMED disease codes found under `protocolApplied[0].targetDisease`
//! determine which mandation rule set applies. Single codes identify the
//! single-disease vaccines; the measles/mumps/rubella combination identifies
//! MMR. The table is fixed at compile time and compared order-insensitively.

use crate::urls;
use immunis_fieldpath::Value;
use std::fmt;

/// Location reported when a disease-code combination cannot be classified
pub const TARGET_DISEASE_CODES_LOCATION: &str =
    "protocolApplied[0].targetDisease[*].coding[?(@.system=='http://snomed.info/sct')].code";

/// Closed set of vaccine types this service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaccineType {
    Covid19,
    Flu,
    Hpv,
    Mmr,
    Rsv,
}

impl fmt::Display for VaccineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VaccineType::Covid19 => "COVID19",
            VaccineType::Flu => "FLU",
            VaccineType::Hpv => "HPV",
            VaccineType::Mmr => "MMR",
            VaccineType::Rsv => "RSV",
        };
        write!(f, "{}", name)
    }
}

/// SNOMED disease codes, per the IPS target-diseases value set
pub mod disease {
    pub const COVID_19: &str = "840539006";
    pub const FLU: &str = "6142004";
    pub const HPV: &str = "240532009";
    pub const MEASLES: &str = "14189004";
    pub const MUMPS: &str = "36989005";
    pub const RUBELLA: &str = "36653000";
    pub const RSV: &str = "55735004";
}

// Combinations are kept sorted so a sorted candidate list can be compared
// directly.
const VACCINE_TYPE_MAPPINGS: &[(&[&str], VaccineType)] = &[
    (&[disease::COVID_19], VaccineType::Covid19),
    (&[disease::FLU], VaccineType::Flu),
    (&[disease::HPV], VaccineType::Hpv),
    (
        &[disease::MEASLES, disease::RUBELLA, disease::MUMPS],
        VaccineType::Mmr,
    ),
    (&[disease::RSV], VaccineType::Rsv),
];

/// The disease-code combination did not match any known vaccine type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationError {
    codes: Vec<String>,
}

impl ClassificationError {
    /// The offending codes, in document order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not a valid combination of disease codes for this service",
            crate::primitives::quoted_list(&self.codes)
        )
    }
}

impl std::error::Error for ClassificationError {}

/// Classify the document's vaccine type from its target disease codes.
///
/// Codes are collected in document order from every `targetDisease` element's
/// SNOMED coding; the comparison against the mapping table is
/// order-insensitive. Structural validation has already guaranteed exactly
/// one SNOMED coding per element, so anything unclassifiable here is a
/// data-quality failure, not a shape failure.
pub fn classify(document: &Value) -> Result<VaccineType, ClassificationError> {
    let mut codes: Vec<String> = Vec::new();

    let diseases = document
        .get("protocolApplied")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|protocol| protocol.get("targetDisease"))
        .and_then(Value::as_array);

    if let Some(diseases) = diseases {
        for element in diseases {
            let Some(codings) = element.get("coding").and_then(Value::as_array) else {
                continue;
            };
            for coding in codings {
                if coding.get("system").and_then(Value::as_str) != Some(urls::SNOMED) {
                    continue;
                }
                match coding.get("code").and_then(Value::as_str) {
                    Some(code) => codes.push(code.to_string()),
                    None => {
                        tracing::warn!(
                            "SNOMED target disease coding without a string code ignored \
                             during classification"
                        );
                    }
                }
            }
        }
    }

    let mut sorted = codes.clone();
    sorted.sort();

    for (combination, vaccine_type) in VACCINE_TYPE_MAPPINGS {
        if combination.len() == sorted.len()
            && combination.iter().zip(&sorted).all(|(a, b)| *a == b.as_str())
        {
            return Ok(*vaccine_type);
        }
    }

    Err(ClassificationError { codes })
}
