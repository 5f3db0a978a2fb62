//! Raw and unified employee record shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceSystem;

/// Column used to match, merge, and upsert records across sources and runs.
pub const IDENTITY_KEY: &str = "employee_id";

/// Source-native key/value record as returned by a connector page.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Column-name keyed row as exchanged with the warehouse.
pub type Row = serde_json::Map<String, serde_json::Value>;

fn default_merged_records_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_data_version() -> u32 {
    1
}

/// Canonical, source-agnostic employee record.
///
/// `merged_records_count` equals the number of source records combined
/// into this one (1 unless produced by a merge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub employee_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<DateTime<Utc>>,
    pub birth_date: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub employment_type: Option<String>,
    pub working_hours: Option<f64>,
    pub break_time: Option<f64>,
    pub annual_salary: Option<f64>,
    pub monthly_salary: Option<f64>,
    pub hourly_wage: Option<f64>,
    pub basic_salary: Option<f64>,
    pub allowances: Option<f64>,
    pub deductions: Option<f64>,
    pub net_salary: Option<f64>,
    pub fixed_premium_wage: Option<f64>,
    pub employment_insurance: Option<String>,
    pub social_insurance: Option<String>,
    pub spouse_info: Option<String>,
    pub work_schedule: Option<String>,
    pub holidays: Option<String>,

    // provenance
    pub source_system: SourceSystem,
    pub source_systems: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub record_id: String,
    #[serde(default = "default_data_version")]
    pub data_version: u32,
    #[serde(default = "default_merged_records_count")]
    pub merged_records_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl UnifiedRecord {
    /// Empty record carrying only provenance metadata.
    #[must_use]
    pub fn new(source_system: SourceSystem, record_id: impl Into<String>, processed_at: DateTime<Utc>) -> Self {
        Self {
            employee_id: None,
            first_name: None,
            last_name: None,
            full_name: None,
            email: None,
            department: None,
            position: None,
            hire_date: None,
            birth_date: None,
            gender: None,
            employment_type: None,
            working_hours: None,
            break_time: None,
            annual_salary: None,
            monthly_salary: None,
            hourly_wage: None,
            basic_salary: None,
            allowances: None,
            deductions: None,
            net_salary: None,
            fixed_premium_wage: None,
            employment_insurance: None,
            social_insurance: None,
            spouse_info: None,
            work_schedule: None,
            holidays: None,
            source_system,
            source_systems: None,
            processed_at,
            record_id: record_id.into(),
            data_version: 1,
            merged_records_count: 1,
            is_active: true,
        }
    }

    /// Identity key, if present and non-empty.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.employee_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Column-keyed view of the record. Missing fields appear as `null`.
    #[must_use]
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(row)) => row,
            _ => Row::new(),
        }
    }

    /// Rebuild a record from a warehouse row.
    ///
    /// # Errors
    ///
    /// Returns an error when required provenance columns are missing or
    /// a column holds a value of the wrong type.
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(row))
    }
}
