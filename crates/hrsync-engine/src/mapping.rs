//! Static per-source field mapping tables.
//!
//! Each source maps its native field names onto [`TargetField`]s. Tables
//! are closed and checked against [`UnifiedRecord`] at compile time: a
//! target either has a setter here or it does not exist.

use chrono::{DateTime, Utc};
use hrsync_types::{SourceSystem, UnifiedRecord};

/// How a target field's raw value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

/// A coerced value ready to be written into a [`UnifiedRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

/// Mappable columns of the unified record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetField {
    EmployeeId,
    FirstName,
    LastName,
    FullName,
    Email,
    Department,
    Position,
    HireDate,
    BirthDate,
    Gender,
    EmploymentType,
    WorkingHours,
    BreakTime,
    AnnualSalary,
    MonthlySalary,
    HourlyWage,
    BasicSalary,
    Allowances,
    Deductions,
    NetSalary,
    FixedPremiumWage,
    EmploymentInsurance,
    SocialInsurance,
    SpouseInfo,
    WorkSchedule,
    Holidays,
}

impl TargetField {
    pub const ALL: [TargetField; 26] = [
        Self::EmployeeId,
        Self::FirstName,
        Self::LastName,
        Self::FullName,
        Self::Email,
        Self::Department,
        Self::Position,
        Self::HireDate,
        Self::BirthDate,
        Self::Gender,
        Self::EmploymentType,
        Self::WorkingHours,
        Self::BreakTime,
        Self::AnnualSalary,
        Self::MonthlySalary,
        Self::HourlyWage,
        Self::BasicSalary,
        Self::Allowances,
        Self::Deductions,
        Self::NetSalary,
        Self::FixedPremiumWage,
        Self::EmploymentInsurance,
        Self::SocialInsurance,
        Self::SpouseInfo,
        Self::WorkSchedule,
        Self::Holidays,
    ];

    /// Column name in the unified schema.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::EmployeeId => "employee_id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::Department => "department",
            Self::Position => "position",
            Self::HireDate => "hire_date",
            Self::BirthDate => "birth_date",
            Self::Gender => "gender",
            Self::EmploymentType => "employment_type",
            Self::WorkingHours => "working_hours",
            Self::BreakTime => "break_time",
            Self::AnnualSalary => "annual_salary",
            Self::MonthlySalary => "monthly_salary",
            Self::HourlyWage => "hourly_wage",
            Self::BasicSalary => "basic_salary",
            Self::Allowances => "allowances",
            Self::Deductions => "deductions",
            Self::NetSalary => "net_salary",
            Self::FixedPremiumWage => "fixed_premium_wage",
            Self::EmploymentInsurance => "employment_insurance",
            Self::SocialInsurance => "social_insurance",
            Self::SpouseInfo => "spouse_info",
            Self::WorkSchedule => "work_schedule",
            Self::Holidays => "holidays",
        }
    }

    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Self::HireDate | Self::BirthDate => FieldKind::Date,
            Self::WorkingHours
            | Self::BreakTime
            | Self::AnnualSalary
            | Self::MonthlySalary
            | Self::HourlyWage
            | Self::BasicSalary
            | Self::Allowances
            | Self::Deductions
            | Self::NetSalary
            | Self::FixedPremiumWage => FieldKind::Number,
            _ => FieldKind::Text,
        }
    }

    /// Write `value` into `record`. A value whose kind does not match the
    /// field is ignored.
    pub fn assign(self, record: &mut UnifiedRecord, value: FieldValue) {
        match (self.kind(), value) {
            (FieldKind::Text, FieldValue::Text(s)) => *self.text_slot(record) = Some(s),
            (FieldKind::Number, FieldValue::Number(n)) => *self.number_slot(record) = Some(n),
            (FieldKind::Date, FieldValue::Date(d)) => *self.date_slot(record) = Some(d),
            (kind, value) => {
                tracing::debug!(field = self.name(), ?kind, ?value, "ignoring mismatched value");
            }
        }
    }

    fn text_slot(self, r: &mut UnifiedRecord) -> &mut Option<String> {
        match self {
            Self::EmployeeId => &mut r.employee_id,
            Self::FirstName => &mut r.first_name,
            Self::LastName => &mut r.last_name,
            Self::FullName => &mut r.full_name,
            Self::Email => &mut r.email,
            Self::Department => &mut r.department,
            Self::Position => &mut r.position,
            Self::Gender => &mut r.gender,
            Self::EmploymentType => &mut r.employment_type,
            Self::EmploymentInsurance => &mut r.employment_insurance,
            Self::SocialInsurance => &mut r.social_insurance,
            Self::SpouseInfo => &mut r.spouse_info,
            Self::WorkSchedule => &mut r.work_schedule,
            // kind() routes only text fields here
            _ => &mut r.holidays,
        }
    }

    fn number_slot(self, r: &mut UnifiedRecord) -> &mut Option<f64> {
        match self {
            Self::WorkingHours => &mut r.working_hours,
            Self::BreakTime => &mut r.break_time,
            Self::AnnualSalary => &mut r.annual_salary,
            Self::MonthlySalary => &mut r.monthly_salary,
            Self::HourlyWage => &mut r.hourly_wage,
            Self::BasicSalary => &mut r.basic_salary,
            Self::Allowances => &mut r.allowances,
            Self::Deductions => &mut r.deductions,
            Self::NetSalary => &mut r.net_salary,
            _ => &mut r.fixed_premium_wage,
        }
    }

    fn date_slot(self, r: &mut UnifiedRecord) -> &mut Option<DateTime<Utc>> {
        match self {
            Self::HireDate => &mut r.hire_date,
            _ => &mut r.birth_date,
        }
    }
}

use TargetField as T;

const GAROON: &[(&str, TargetField)] = &[
    ("employee_id", T::EmployeeId),
    ("last_name_kanji", T::LastName),
    ("first_name_kanji", T::FirstName),
    ("email_address", T::Email),
    ("department_1", T::Department),
    ("joining_date", T::HireDate),
    ("work_hours", T::WorkingHours),
    ("work_type", T::EmploymentType),
    ("annual_salary", T::AnnualSalary),
];

const SMARTHR: &[(&str, TargetField)] = &[
    ("employee_id", T::EmployeeId),
    ("last_name_katakana", T::LastName),
    ("first_name_katakana", T::FirstName),
    ("personal_email", T::Email),
    ("department", T::Department),
    ("joining_date", T::HireDate),
    ("birth_date", T::BirthDate),
    ("gender", T::Gender),
    ("working_hours", T::WorkingHours),
    ("work_type", T::EmploymentType),
    ("annual_salary", T::AnnualSalary),
    ("monthly_salary", T::MonthlySalary),
    ("employment_insurance_status", T::EmploymentInsurance),
    ("social_insurance_status", T::SocialInsurance),
];

const JOBCAN: &[(&str, TargetField)] = &[
    ("employee_id", T::EmployeeId),
    ("full_name", T::FullName),
    ("department", T::Department),
    ("joining_date", T::HireDate),
    ("hourly_wage", T::HourlyWage),
];

const PCA: &[(&str, TargetField)] = &[
    ("employee_id", T::EmployeeId),
    ("full_name", T::FullName),
    ("department", T::Department),
    ("position", T::Position),
    ("basic_salary", T::BasicSalary),
    ("allowances", T::Allowances),
    ("deductions", T::Deductions),
    ("net_salary", T::NetSalary),
];

const SHEETS: &[(&str, TargetField)] = &[
    ("employee_code", T::EmployeeId),
    ("name", T::FullName),
    ("department", T::Department),
    ("position", T::Position),
    ("hire_date", T::HireDate),
    ("salary", T::MonthlySalary),
];

/// Ordered `(source field, target field)` pairs for `source`.
#[must_use]
pub fn field_map(source: SourceSystem) -> &'static [(&'static str, TargetField)] {
    match source {
        SourceSystem::Garoon => GAROON,
        SourceSystem::Smarthr => SMARTHR,
        SourceSystem::Jobcan => JOBCAN,
        SourceSystem::Pca => PCA,
        SourceSystem::Sheets => SHEETS,
    }
}
