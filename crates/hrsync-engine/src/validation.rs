//! Rule-driven record validation.
//!
//! Rules are compiled once into a [`RuleSet`] and evaluated per row by a
//! single dispatch over [`ValidationRule`]. Evaluation is pure.

use std::sync::LazyLock;

use hrsync_types::{Row, IDENTITY_KEY};
use regex::Regex;
use serde_json::Value;

use crate::transform::parse_flexible_date;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Whether `value` looks like an email address.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
    /// Value must be present and, for strings, non-empty.
    Required,
    EmailFormat,
    NumericType,
    NumericRange { min: f64 },
    DateFormat,
    MinLength(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: Vec<ValidationRule>,
}

/// Result of validating one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::employee()
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ValidationRule {
    /// Check a present value. `Required` is handled by the caller.
    fn check(&self, field: &str, value: &Value) -> Option<String> {
        match self {
            Self::Required => None,
            Self::EmailFormat => match value {
                Value::String(s) if is_valid_email(s) => None,
                other => Some(format!(
                    "Invalid email format for field {field}: {}",
                    display_value(other)
                )),
            },
            Self::NumericType => (!value.is_number()).then(|| {
                format!(
                    "Field {field} should be a number, got {}",
                    json_type_name(value)
                )
            }),
            Self::NumericRange { min } => value
                .as_f64()
                .filter(|v| v < min)
                .map(|v| format!("Field {field} value {v} is below minimum {min}")),
            Self::DateFormat => parse_flexible_date(value).is_none().then(|| {
                format!(
                    "Invalid date format for field {field}: {}",
                    display_value(value)
                )
            }),
            Self::MinLength(min) => value
                .as_str()
                .map(|s| s.chars().count())
                .filter(|len| len < min)
                .map(|len| format!("Field {field} length {len} is below minimum {min}")),
        }
    }
}

impl RuleSet {
    #[must_use]
    pub fn new(fields: Vec<FieldRules>) -> Self {
        Self { fields }
    }

    /// Rules for unified employee records.
    #[must_use]
    pub fn employee() -> Self {
        use ValidationRule::{DateFormat, EmailFormat, MinLength, NumericRange, NumericType, Required};

        Self::new(vec![
            FieldRules {
                field: IDENTITY_KEY,
                rules: vec![Required, MinLength(1)],
            },
            FieldRules {
                field: "email",
                rules: vec![EmailFormat],
            },
            FieldRules {
                field: "hire_date",
                rules: vec![DateFormat],
            },
            FieldRules {
                field: "annual_salary",
                rules: vec![NumericType, NumericRange { min: 0.0 }],
            },
            FieldRules {
                field: "monthly_salary",
                rules: vec![NumericType, NumericRange { min: 0.0 }],
            },
        ])
    }

    /// Validate one row. Missing optional fields are skipped; a missing
    /// required field reports once and skips its remaining rules.
    #[must_use]
    pub fn validate(&self, row: &Row) -> ValidationOutcome {
        let mut errors = Vec::new();

        for FieldRules { field, rules } in &self.fields {
            let value = row.get(*field);
            if is_missing(value) {
                if rules.contains(&ValidationRule::Required) {
                    errors.push(format!("Required field {field} is missing"));
                }
                continue;
            }
            let Some(value) = value else { continue };
            errors.extend(rules.iter().filter_map(|rule| rule.check(field, value)));
        }

        ValidationOutcome::from_errors(errors)
    }
}
