//! Per-field validation rules.
//!
//! A [`Rule`] decides whether a raw string is acceptable and, if not, which
//! message to show. Rules are pure: the only outside inputs (sibling field
//! values and the current calendar year) arrive through [`CheckContext`].
//!
//! [`validate`] is the field-name driven entry point used when no schema is
//! involved: it picks the rule with [`Rule::for_field`] and checks it against
//! today's year.

use std::num::IntErrorKind;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::types::FieldValues;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static MODULE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,4}[0-9]{3}$").expect("module code pattern"));
static ZIP_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(-[0-9]{4})?$").expect("zip code pattern"));

const SPECIAL_CHARS: &str = "!@#$%^&*";
const MIN_PASSWORD_LEN: usize = 8;

/// Validation rule attached to a field.
///
/// Serialized with a `type` tag so schemas can declare rules in TOML:
/// `rule = { type = "min_length", min = 10 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Non-blank after trimming.
    Required,
    Email,
    /// Exactly 10 ASCII digits.
    Phone,
    /// One or more ASCII letters or digits.
    StudentId,
    /// Four digits, not after the current year.
    PublishedYear,
    /// Integer greater than zero, optionally capped.
    PositiveInteger {
        #[serde(default)]
        max: Option<u64>,
    },
    /// Uppercase, lowercase, digit, special character and minimum length.
    PasswordStrength,
    /// Equal to the current value of another field.
    MatchesField { field: String },
    /// 10 or 13 digits once hyphens and whitespace are removed.
    Isbn,
    /// 2-4 uppercase letters followed by 3 digits.
    ModuleCode,
    /// US ZIP or ZIP+4.
    ZipCode,
    MinLength {
        min: usize,
        #[serde(default)]
        message: Option<String>,
    },
    OneOf { options: Vec<String> },
}

/// Outside inputs a rule may consult.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Sibling values, needed by [`Rule::MatchesField`].
    pub fields: Option<&'a FieldValues>,
    pub current_year: i32,
}

impl<'a> CheckContext<'a> {
    /// Context pinned to today's year in local time.
    pub fn now(fields: Option<&'a FieldValues>) -> Self {
        Self {
            fields,
            current_year: current_year(),
        }
    }
}

/// Current calendar year in local time.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Validate `value` for `field_name` using the default rule for that name.
///
/// Returns `None` when the value is acceptable.
pub fn validate(field_name: &str, value: &str, context: Option<&FieldValues>) -> Option<String> {
    Rule::for_field(field_name).check(value, &CheckContext::now(context))
}

impl Rule {
    /// Default rule for a field name. Unknown names are only required.
    pub fn for_field(field_name: &str) -> Rule {
        match field_name {
            "email" => Rule::Email,
            "phone" => Rule::Phone,
            "studentId" => Rule::StudentId,
            "publishedYear" => Rule::PublishedYear,
            "credits" => Rule::PositiveInteger { max: None },
            "password" => Rule::PasswordStrength,
            "confirmPassword" => Rule::MatchesField {
                field: "password".to_string(),
            },
            "isbn" => Rule::Isbn,
            "moduleCode" => Rule::ModuleCode,
            "zipCode" => Rule::ZipCode,
            _ => Rule::Required,
        }
    }

    /// Check `value`, returning the failure message if it is not acceptable.
    pub fn check(&self, value: &str, ctx: &CheckContext<'_>) -> Option<String> {
        match self {
            Rule::Required => {
                value.trim().is_empty().then(|| "This field is required".to_string())
            }
            Rule::Email => (!EMAIL_RE.is_match(value)).then(|| "Invalid email format".to_string()),
            Rule::Phone => (!is_digits_of_len(value, 10))
                .then(|| "Phone number must be 10 digits".to_string()),
            Rule::StudentId => (value.is_empty()
                || !value.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| "Student ID must be alphanumeric".to_string()),
            Rule::PublishedYear => {
                let ok = is_digits_of_len(value, 4)
                    && value
                        .parse::<i32>()
                        .is_ok_and(|year| year <= ctx.current_year);
                (!ok).then(|| "Invalid year".to_string())
            }
            Rule::PositiveInteger { max } => check_positive_integer(value, *max),
            Rule::PasswordStrength => {
                let unmet = unmet_password_requirements(value);
                (!unmet.is_empty())
                    .then(|| format!("Password must contain: {}", unmet.join(", ")))
            }
            Rule::MatchesField { field } => {
                if value.is_empty() {
                    return Some("Please confirm your password".to_string());
                }
                let other = ctx
                    .fields
                    .and_then(|fields| fields.get(field))
                    .map(String::as_str)
                    .unwrap_or_default();
                (value != other).then(|| "Passwords do not match".to_string())
            }
            Rule::Isbn => check_isbn(value),
            Rule::ModuleCode => (!MODULE_CODE_RE.is_match(value)).then(|| {
                "Module code must be 2-4 capital letters followed by 3 digits (e.g., CS101)"
                    .to_string()
            }),
            Rule::ZipCode => {
                (!ZIP_CODE_RE.is_match(value)).then(|| "Invalid ZIP code format".to_string())
            }
            Rule::MinLength { min, message } => (value.chars().count() < *min).then(|| {
                message
                    .clone()
                    .unwrap_or_else(|| format!("Must be at least {min} characters long"))
            }),
            Rule::OneOf { options } => (!options.iter().any(|option| option == value))
                .then(|| format!("Select one of: {}", options.join(", "))),
        }
    }
}

/// Password requirements `value` does not meet, in display order.
pub fn unmet_password_requirements(value: &str) -> Vec<&'static str> {
    let mut unmet = Vec::new();
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        unmet.push("uppercase letter");
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        unmet.push("lowercase letter");
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        unmet.push("number");
    }
    if !value.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        unmet.push("special character");
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        unmet.push("8+ characters");
    }
    unmet
}

fn is_digits_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn check_positive_integer(value: &str, max: Option<u64>) -> Option<String> {
    // `None` means positive but too large for u64: only a cap can reject it.
    let parsed = match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => None,
        _ => return Some("Credits must be a positive number".to_string()),
    };
    match (parsed, max) {
        (None, Some(max)) => Some(format!("Credits cannot exceed {max}")),
        (Some(n), Some(max)) if n > max => Some(format!("Credits cannot exceed {max}")),
        _ => None,
    }
}

fn check_isbn(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    let len = cleaned.chars().count();
    if len != 10 && len != 13 {
        return Some("ISBN must be 10 or 13 digits".to_string());
    }
    if !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return Some("ISBN must contain only numbers".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(year: i32) -> CheckContext<'static> {
        CheckContext {
            fields: None,
            current_year: year,
        }
    }

    #[test]
    fn email_accepts_simple_address() {
        assert_eq!(validate("email", "a@b.com", None), None);
        assert_eq!(
            validate("email", "not-an-email", None),
            Some("Invalid email format".to_string())
        );
        assert!(validate("email", "a@@b.com", None).is_some());
        assert!(validate("email", "a b@c.com", None).is_some());
        assert!(validate("email", "a@bcom", None).is_some());
    }

    #[test]
    fn phone_requires_exactly_ten_digits() {
        assert_eq!(validate("phone", "1234567890", None), None);
        assert!(validate("phone", "12345", None).is_some());
        assert!(validate("phone", "12345678901", None).is_some());
        assert!(validate("phone", "12345-7890", None).is_some());
    }

    #[test]
    fn student_id_is_alphanumeric() {
        assert_eq!(validate("studentId", "ab12", None), None);
        assert!(validate("studentId", "", None).is_some());
        assert!(validate("studentId", "ab-12", None).is_some());
    }

    /// Year rule is checked against an explicit year so the test does not age.
    #[test]
    fn published_year_rejects_future_years() {
        let rule = Rule::PublishedYear;
        assert_eq!(rule.check("2020", &ctx(2026)), None);
        assert_eq!(rule.check("2026", &ctx(2026)), None);
        assert_eq!(
            rule.check("2027", &ctx(2026)),
            Some("Invalid year".to_string())
        );
        assert!(rule.check("999", &ctx(2026)).is_some());
        assert!(rule.check("20a0", &ctx(2026)).is_some());
        assert!(validate("publishedYear", "2999", None).is_some());
        assert_eq!(validate("publishedYear", "2020", None), None);
    }

    #[test]
    fn credits_must_be_positive_and_respect_max() {
        assert_eq!(validate("credits", "5", None), None);
        assert!(validate("credits", "0", None).is_some());
        assert!(validate("credits", "-3", None).is_some());
        assert!(validate("credits", "abc", None).is_some());

        let capped = Rule::PositiveInteger { max: Some(20) };
        assert_eq!(capped.check("20", &ctx(2026)), None);
        assert_eq!(
            capped.check("21", &ctx(2026)),
            Some("Credits cannot exceed 20".to_string())
        );
    }

    #[test]
    fn credits_beyond_u64_are_large_not_negative() {
        let huge = "99999999999999999999999";
        assert_eq!(validate("credits", huge, None), None);
        assert_eq!(
            Rule::PositiveInteger { max: Some(20) }.check(huge, &ctx(2026)),
            Some("Credits cannot exceed 20".to_string())
        );
        assert_eq!(
            validate("credits", "-99999999999999999999999", None),
            Some("Credits must be a positive number".to_string())
        );
    }

    #[test]
    fn password_lists_every_unmet_requirement() {
        assert_eq!(validate("password", "Abcdef1!", None), None);
        assert_eq!(
            validate("password", "abc", None),
            Some(
                "Password must contain: uppercase letter, number, special character, 8+ characters"
                    .to_string()
            )
        );
        assert_eq!(
            unmet_password_requirements(""),
            vec![
                "uppercase letter",
                "lowercase letter",
                "number",
                "special character",
                "8+ characters"
            ]
        );
    }

    #[test]
    fn confirm_password_compares_against_sibling() {
        let mut fields = FieldValues::new();
        fields.insert("password".to_string(), "Secret1!".to_string());

        assert_eq!(validate("confirmPassword", "Secret1!", Some(&fields)), None);
        assert_eq!(
            validate("confirmPassword", "Secret2!", Some(&fields)),
            Some("Passwords do not match".to_string())
        );
        assert_eq!(
            validate("confirmPassword", "", Some(&fields)),
            Some("Please confirm your password".to_string())
        );
        assert!(validate("confirmPassword", "x", None).is_some());
    }

    #[test]
    fn isbn_ignores_hyphens_and_spaces() {
        assert_eq!(validate("isbn", "0-306-40615-2", None), None);
        assert_eq!(validate("isbn", "978 0 306 40615 7", None), None);
        assert_eq!(
            validate("isbn", "12345", None),
            Some("ISBN must be 10 or 13 digits".to_string())
        );
        assert_eq!(
            validate("isbn", "12345678X0", None),
            Some("ISBN must contain only numbers".to_string())
        );
    }

    #[test]
    fn module_code_is_uppercase_letters_then_three_digits() {
        assert_eq!(validate("moduleCode", "CS101", None), None);
        assert_eq!(validate("moduleCode", "COMP101", None), None);
        assert!(validate("moduleCode", "cs101", None).is_some());
        assert!(validate("moduleCode", "CSCI1010", None).is_some());
        assert!(validate("moduleCode", "C101", None).is_some());
    }

    #[test]
    fn zip_code_accepts_plus_four() {
        assert_eq!(validate("zipCode", "12345", None), None);
        assert_eq!(validate("zipCode", "12345-6789", None), None);
        assert!(validate("zipCode", "1234", None).is_some());
    }

    #[test]
    fn unknown_fields_are_required() {
        assert_eq!(validate("city", "Springfield", None), None);
        assert_eq!(
            validate("city", "   ", None),
            Some("This field is required".to_string())
        );
    }

    #[test]
    fn one_of_and_min_length_use_declared_options() {
        let vehicle = Rule::OneOf {
            options: vec!["Car".to_string(), "Truck".to_string()],
        };
        assert_eq!(vehicle.check("Car", &ctx(2026)), None);
        assert_eq!(
            vehicle.check("Boat", &ctx(2026)),
            Some("Select one of: Car, Truck".to_string())
        );

        let min = Rule::MinLength {
            min: 3,
            message: None,
        };
        assert_eq!(min.check("abc", &ctx(2026)), None);
        assert_eq!(
            min.check("ab", &ctx(2026)),
            Some("Must be at least 3 characters long".to_string())
        );
    }

    #[test]
    fn validate_is_deterministic() {
        for (field, value) in [("email", "x@y.z"), ("phone", "12"), ("misc", "")] {
            assert_eq!(validate(field, value, None), validate(field, value, None));
        }
    }

    #[test]
    fn rules_deserialize_from_tagged_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rule: Rule,
        }
        let parsed: Wrapper =
            toml::from_str("rule = { type = \"min_length\", min = 10 }").expect("parse");
        assert_eq!(
            parsed.rule,
            Rule::MinLength {
                min: 10,
                message: None
            }
        );
    }
}
