//! Primitive value validators
//!
//! Reusable checks for the scalar and collection shapes that appear across
//! the structural rules: non-empty strings, fixed-length strings, enumerated
//! values, dates, offset datetimes, positive integers, bounded-precision
//! numbers, lists, key-uniqueness across a list, UK postcodes and NHS
//! numbers.
//!
//! Every check is a pure function over a borrowed value. On failure it
//! returns the [`ValidationIssue`] carrying the legacy message for the given
//! field location; it never mutates the document and never panics on
//! unexpected shapes.

use crate::validator::{IssueCode, ValidationIssue};
use immunis_fieldpath::Value;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static POSTCODE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]{1,2}([0-9]{1,2}|[0-9][a-zA-Z])\s*[0-9][a-zA-Z]{2}$")
        .expect("postcode pattern")
});

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern"));

static DATE_TIME_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{1,3})?[+-]\d{2}:\d{2}$")
        .expect("datetime pattern")
});

const DATE_TIME_MESSAGE: &str = "must be a string in the format \"YYYY-MM-DDThh:mm:ss+zz:zz\" or \
    \"YYYY-MM-DDThh:mm:ss-zz:zz\" (i.e. date and time, including timezone offset in hours and \
    minutes). Milliseconds are optional after the seconds (e.g. 2021-01-01T00:00:00.000+00:00)";

type CheckResult = Result<(), ValidationIssue>;

/// Options for [`check_string`]
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Exact length requirement; also suppresses the non-empty check
    pub defined_length: Option<usize>,
    /// Upper length bound
    pub max_length: Option<usize>,
    /// Closed set of accepted values
    pub allowed: Option<&'static [&'static str]>,
    /// When set, interior spaces are rejected
    pub spaces_allowed: Option<bool>,
    /// Two-part UK postcode mode
    pub is_postal_code: bool,
}

/// Options for [`check_list`]
#[derive(Debug, Clone, Default)]
pub struct ListRules {
    /// Exact length requirement; also suppresses the non-empty check
    pub defined_length: Option<usize>,
    /// Upper length bound
    pub max_length: Option<usize>,
    /// Every element must be a non-empty string
    pub elements_are_strings: bool,
    /// Every element must be a non-empty object
    pub elements_are_objects: bool,
}

fn structure(location: &str, message: String) -> ValidationIssue {
    ValidationIssue::new(IssueCode::Structure, location, message)
}

fn value_issue(location: &str, message: String) -> ValidationIssue {
    ValidationIssue::new(IssueCode::Value, location, message)
}

/// Validate a string value against the given rules.
pub fn check_string(value: &Value, location: &str, rules: &StringRules) -> CheckResult {
    let Some(s) = value.as_str() else {
        return Err(structure(location, format!("{} must be a string", location)));
    };

    if rules.is_postal_code {
        return check_postal_code(s, location);
    }

    if let Some(expected) = rules.defined_length {
        if s.chars().count() != expected {
            return Err(value_issue(
                location,
                format!("{} must be {} characters", location, expected),
            ));
        }
    } else if s.is_empty() {
        return Err(value_issue(
            location,
            format!("{} must be a non-empty string", location),
        ));
    }

    if let Some(max) = rules.max_length {
        if s.chars().count() > max {
            return Err(value_issue(
                location,
                format!("{} must be {} or fewer characters", location, max),
            ));
        }
    }

    if let Some(allowed) = rules.allowed {
        if !allowed.contains(&s) {
            return Err(value_issue(
                location,
                format!(
                    "{} must be one of the following: {}",
                    location,
                    allowed.join(", ")
                ),
            ));
        }
    }

    if rules.spaces_allowed == Some(false) && s.contains(' ') {
        return Err(value_issue(
            location,
            format!("{} must not contain spaces", location),
        ));
    }

    Ok(())
}

/// UK postcode shape: two parts divided by exactly one space, at most eight
/// characters once the space is removed, and the standard outward/inward
/// pattern.
fn check_postal_code(s: &str, location: &str) -> CheckResult {
    if s.is_empty() {
        return Err(value_issue(
            location,
            format!("{} must be a non-empty string", location),
        ));
    }

    if s.matches(' ').count() != 1 || s.starts_with(' ') || s.ends_with(' ') {
        return Err(value_issue(
            location,
            format!(
                "{} must contain a single space, which divides the two parts of the postal code",
                location
            ),
        ));
    }

    if s.replace(' ', "").chars().count() > 8 {
        return Err(value_issue(
            location,
            format!(
                "{} must be 8 or fewer characters (excluding spaces)",
                location
            ),
        ));
    }

    if !POSTCODE_FORMAT.is_match(s) {
        return Err(value_issue(
            location,
            format!("{} must be a valid postal code", location),
        ));
    }

    Ok(())
}

/// Validate a list value against the given rules.
pub fn check_list(value: &Value, location: &str, rules: &ListRules) -> CheckResult {
    let Some(items) = value.as_array() else {
        return Err(structure(location, format!("{} must be an array", location)));
    };

    if let Some(expected) = rules.defined_length {
        if items.len() != expected {
            return Err(value_issue(
                location,
                format!("{} must be an array of length {}", location, expected),
            ));
        }
    } else if items.is_empty() {
        return Err(value_issue(
            location,
            format!("{} must be a non-empty array", location),
        ));
    }

    if let Some(max) = rules.max_length {
        if items.len() > max {
            return Err(value_issue(
                location,
                format!("{} must be an array of {} or fewer items", location, max),
            ));
        }
    }

    if rules.elements_are_strings
        && !items
            .iter()
            .all(|item| item.as_str().is_some_and(|s| !s.is_empty()))
    {
        return Err(value_issue(
            location,
            format!("{} must be an array of non-empty strings", location),
        ));
    }

    if rules.elements_are_objects
        && !items
            .iter()
            .all(|item| item.as_object().is_some_and(|map| !map.is_empty()))
    {
        return Err(value_issue(
            location,
            format!("{} must be an array of non-empty objects", location),
        ));
    }

    Ok(())
}

/// Validate a `YYYY-MM-DD` string representing a real calendar date.
pub fn check_date(value: &Value, location: &str) -> CheckResult {
    let failure = || {
        value_issue(
            location,
            format!(
                "{} must be a valid date string in the format \"YYYY-MM-DD\"",
                location
            ),
        )
    };

    let Some(s) = value.as_str() else {
        return Err(structure(location, format!("{} must be a string", location)));
    };

    if !DATE_FORMAT.is_match(s) {
        return Err(failure());
    }

    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| failure())
}

/// Validate an offset datetime string. Milliseconds are optional; the
/// timezone offset is not.
pub fn check_date_time(value: &Value, location: &str) -> CheckResult {
    let failure = || value_issue(location, format!("{} {}", location, DATE_TIME_MESSAGE));

    let Some(s) = value.as_str() else {
        return Err(structure(location, format!("{} must be a string", location)));
    };

    if !DATE_TIME_FORMAT.is_match(s) {
        return Err(failure());
    }

    chrono::DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%:z")
        .map(|_| ())
        .map_err(|_| failure())
}

/// Validate a real boolean (not a string or number impersonating one).
pub fn check_boolean(value: &Value, location: &str) -> CheckResult {
    match value {
        Value::Bool(_) => Ok(()),
        _ => Err(structure(
            location,
            format!("{} must be a boolean", location),
        )),
    }
}

/// Validate an integer >= 1, optionally bounded above.
pub fn check_positive_integer(value: &Value, location: &str, max_value: Option<i64>) -> CheckResult {
    let Some(n) = value.as_integer() else {
        return Err(structure(
            location,
            format!("{} must be a positive integer", location),
        ));
    };

    match max_value {
        Some(max) if n < 1 || n > max => Err(value_issue(
            location,
            format!("{} must be an integer in the range 1 to {}", location, max),
        )),
        None if n < 1 => Err(value_issue(
            location,
            format!("{} must be a positive integer", location),
        )),
        _ => Ok(()),
    }
}

/// Validate an integer or exact decimal with a bounded number of fractional
/// digits. Strings that look numeric are rejected.
pub fn check_number(value: &Value, location: &str, max_decimal_places: u32) -> CheckResult {
    match value {
        Value::Integer(_) => Ok(()),
        Value::Decimal(d) if d.scale() <= max_decimal_places => Ok(()),
        Value::Decimal(_) => Err(value_issue(
            location,
            format!(
                "{} must be a number with a maximum of {} decimal places",
                location, max_decimal_places
            ),
        )),
        _ => Err(structure(location, format!("{} must be a number", location))),
    }
}

/// Validate that no two list elements share a value for `key`.
///
/// The location template carries a `FIELD_TO_REPLACE` placeholder which is
/// substituted with the duplicated value when reporting.
pub fn check_unique_by(items: &[Value], key: &str, location_template: &str) -> CheckResult {
    let mut seen = HashSet::new();

    for item in items {
        if let Some(v) = item.get(key).and_then(Value::as_str) {
            if !seen.insert(v) {
                let location = location_template.replace("FIELD_TO_REPLACE", v);
                let message = format!("{} must be unique", location);
                return Err(ValidationIssue::new(IssueCode::Value, location, message));
            }
        }
    }

    Ok(())
}

/// Validate the NHS number Modulus-11 checksum.
///
/// The value must already be a 10-digit string; [`check_string`] with a
/// defined length of 10 runs first in the rule that uses this.
pub fn check_nhs_number(value: &Value, location: &str) -> CheckResult {
    let Some(s) = value.as_str() else {
        return Err(structure(location, format!("{} must be a string", location)));
    };

    if nhs_number_mod11(s) {
        Ok(())
    } else {
        Err(value_issue(
            location,
            format!("{} is not a valid NHS number", location),
        ))
    }
}

/// Modulus-11 check: weight the first nine digits by 10..2, sum, and compare
/// `11 - (sum mod 11)` (11 maps to 0) against the tenth digit. A computed
/// check value of 10 means the number is invalid outright.
pub fn nhs_number_mod11(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 10 || candidate.chars().count() != 10 {
        return false;
    }

    let total: u32 = digits[..9]
        .iter()
        .zip((2..=10u32).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();

    let check_digit = match total % 11 {
        0 => 0,
        remainder => 11 - remainder,
    };

    check_digit != 10 && check_digit == digits[9]
}

/// Render a list of strings the way the legacy error messages did:
/// `['a', 'b']`.
pub(crate) fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", item.as_ref()))
        .collect();
    format!("[{}]", quoted.join(", "))
}
