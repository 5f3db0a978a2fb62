//! Raw record to unified record transformation.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hrsync_types::{RawRecord, SourceSystem, UnifiedRecord};
use regex::Regex;
use serde_json::Value;

use crate::mapping::{field_map, FieldKind, FieldValue};
use crate::validation::{RuleSet, ValidationOutcome};

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid number regex")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

/// Keys tried, in order, for the identity part of a record id.
const RECORD_ID_KEYS: &[&str] = &["employee_id", "emp_code", "code"];

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse dates in the formats source systems emit. Date-only values
/// become midnight UTC; integers are epoch milliseconds.
#[must_use]
pub fn parse_flexible_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Numbers pass through; strings use their longest numeric prefix.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => LEADING_NUMBER_RE
            .find(s.trim())
            .and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    match kind {
        FieldKind::Date => parse_flexible_date(value).map(FieldValue::Date),
        FieldKind::Number => parse_number(value).map(FieldValue::Number),
        FieldKind::Text => coerce_text(value).map(FieldValue::Text),
    }
}

/// `{source}_{identity or fallback}_{epoch millis}_{random}`.
fn generate_record_id(source: SourceSystem, raw: &RawRecord, now: DateTime<Utc>) -> String {
    let identity = RECORD_ID_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(coerce_text))
        .unwrap_or_else(|| "unknown".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}",
        source.as_str(),
        identity,
        now.timestamp_millis(),
        &suffix[..8]
    )
}

/// A transformed record with its (advisory) validation result.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    pub record: UnifiedRecord,
    pub validation: ValidationOutcome,
}

/// Maps raw source records onto [`UnifiedRecord`]s and validates them.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    rules: RuleSet,
}

impl Transformer {
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Transform a page run. Output has one entry per input record.
    #[must_use]
    pub fn transform(&self, data: &[RawRecord], source: SourceSystem) -> Vec<TransformedRecord> {
        self.transform_at(data, source, Utc::now())
    }

    /// [`transform`](Self::transform) with a fixed `processed_at`.
    #[must_use]
    pub fn transform_at(
        &self,
        data: &[RawRecord],
        source: SourceSystem,
        now: DateTime<Utc>,
    ) -> Vec<TransformedRecord> {
        data.iter()
            .map(|raw| self.transform_record(raw, source, now))
            .collect()
    }

    fn transform_record(
        &self,
        raw: &RawRecord,
        source: SourceSystem,
        now: DateTime<Utc>,
    ) -> TransformedRecord {
        let mut record = UnifiedRecord::new(source, generate_record_id(source, raw, now), now);

        for (source_field, target) in field_map(source) {
            let Some(value) = raw.get(*source_field).filter(|v| !v.is_null()) else {
                continue;
            };
            if let Some(coerced) = coerce(target.kind(), value) {
                target.assign(&mut record, coerced);
            }
        }

        let validation = self.rules.validate(&record.to_row());
        if !validation.is_valid {
            tracing::warn!(
                record_id = record.record_id.as_str(),
                source = source.as_str(),
                errors = ?validation.errors,
                "Validation warnings for record"
            );
        }

        TransformedRecord { record, validation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn garoon_record_transforms() {
        let input = raw(json!({
            "employee_id": "EMP001",
            "last_name_kanji": "田中",
            "first_name_kanji": "太郎",
            "email_address": "tanaka@company.com",
            "department_1": "営業部",
            "joining_date": "2023-01-15",
            "annual_salary": 5_000_000,
        }));
        let out = Transformer::default().transform_at(&[input], SourceSystem::Garoon, now());
        assert_eq!(out.len(), 1);
        let r = &out[0].record;
        assert_eq!(r.employee_id.as_deref(), Some("EMP001"));
        assert_eq!(r.last_name.as_deref(), Some("田中"));
        assert_eq!(r.first_name.as_deref(), Some("太郎"));
        assert_eq!(r.department.as_deref(), Some("営業部"));
        assert_eq!(r.source_system, SourceSystem::Garoon);
        assert_eq!(r.hire_date, Some("2023-01-15T00:00:00Z".parse().unwrap()));
        assert_eq!(r.annual_salary, Some(5_000_000.0));
        assert_eq!(r.processed_at, now());
        assert_eq!(r.data_version, 1);
        assert!(out[0].validation.is_valid);

        let row = r.to_row();
        assert_eq!(row["hire_date"], "2023-01-15T00:00:00Z");
    }

    #[test]
    fn record_id_format() {
        let out = Transformer::default().transform_at(
            &[raw(json!({"employee_code": 42})), raw(json!({}))],
            SourceSystem::Sheets,
            now(),
        );
        let millis = now().timestamp_millis();
        assert!(out[0].record.record_id.starts_with(&format!("sheets_unknown_{millis}_")));
        assert!(out[1].record.record_id.starts_with(&format!("sheets_unknown_{millis}_")));
        assert_ne!(out[0].record.record_id, out[1].record.record_id);

        let out = Transformer::default().transform_at(
            &[raw(json!({"employee_id": "E7"}))],
            SourceSystem::Jobcan,
            now(),
        );
        let id = &out[0].record.record_id;
        assert!(id.starts_with(&format!("jobcan_E7_{millis}_")), "got: {id}");
        assert_eq!(id.rsplit('_').next().unwrap().len(), 8);
    }

    #[test]
    fn numeric_ids_become_strings() {
        let out = Transformer::default().transform_at(
            &[raw(json!({"employee_code": 1042, "salary": "310000"}))],
            SourceSystem::Sheets,
            now(),
        );
        assert_eq!(out[0].record.employee_id.as_deref(), Some("1042"));
        assert_eq!(out[0].record.monthly_salary, Some(310_000.0));
    }

    #[test]
    fn unmapped_fields_dropped_and_blanks_missing() {
        let out = Transformer::default().transform_at(
            &[raw(json!({
                "employee_id": "P1",
                "full_name": "  Sato Hanako  ",
                "department": "",
                "bank_account": "123-456",
                "position": null,
            }))],
            SourceSystem::Pca,
            now(),
        );
        let r = &out[0].record;
        assert_eq!(r.full_name.as_deref(), Some("Sato Hanako"));
        assert!(r.department.is_none());
        assert!(r.position.is_none());
        assert!(!r.to_row().contains_key("bank_account"));
    }

    #[test]
    fn invalid_records_still_flow() {
        let out = Transformer::default().transform_at(
            &[raw(json!({"personal_email": "broken"}))],
            SourceSystem::Smarthr,
            now(),
        );
        assert_eq!(out.len(), 1);
        assert!(!out[0].validation.is_valid);
        assert!(out[0]
            .validation
            .errors
            .contains(&"Required field employee_id is missing".to_string()));
    }

    #[test]
    fn unparsable_values_become_null() {
        let out = Transformer::default().transform_at(
            &[raw(json!({
                "employee_id": "J1",
                "joining_date": "not a date",
                "hourly_wage": "about a thousand",
            }))],
            SourceSystem::Jobcan,
            now(),
        );
        assert!(out[0].record.hire_date.is_none());
        assert!(out[0].record.hourly_wage.is_none());
    }

    #[rstest]
    #[case("2023-01-15", "2023-01-15T00:00:00Z")]
    #[case("2023/01/15", "2023-01-15T00:00:00Z")]
    #[case("2023-01-15 09:30:00", "2023-01-15T09:30:00Z")]
    #[case("2023-01-15T09:30:00", "2023-01-15T09:30:00Z")]
    #[case("2023-01-15T09:30:00.250", "2023-01-15T09:30:00.250Z")]
    #[case("2023-01-15T09:30:00+09:00", "2023-01-15T00:30:00Z")]
    #[case("2023年1月15日", "2023-01-15T00:00:00Z")]
    fn flexible_dates(#[case] input: &str, #[case] expected: &str) {
        let expected: DateTime<Utc> = expected.parse().unwrap();
        assert_eq!(parse_flexible_date(&json!(input)), Some(expected));
    }

    #[test]
    fn epoch_millis_date() {
        assert_eq!(
            parse_flexible_date(&json!(1_673_740_800_000_i64)),
            Some("2023-01-15T00:00:00Z".parse().unwrap())
        );
        assert_eq!(parse_flexible_date(&json!("  ")), None);
        assert_eq!(parse_flexible_date(&json!(true)), None);
    }

    #[rstest]
    #[case(json!(5000), Some(5000.0))]
    #[case(json!("5000円"), Some(5000.0))]
    #[case(json!(" 12.5 hours"), Some(12.5))]
    #[case(json!("-3"), Some(-3.0))]
    #[case(json!("1e3"), Some(1000.0))]
    #[case(json!("abc"), None)]
    #[case(json!(""), None)]
    #[case(json!(false), None)]
    fn leading_number(#[case] input: Value, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(&input), expected);
    }
}
