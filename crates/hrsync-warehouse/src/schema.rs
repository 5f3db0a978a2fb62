//! Declared table schemas.

use hrsync_types::IDENTITY_KEY;

/// Logical column type. Maps onto a storage type per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    /// UTC instant, stored as fixed-width ISO-8601 text.
    Timestamp,
}

impl ColumnType {
    /// `SQLite` column type used in DDL.
    #[must_use]
    pub fn sqlite_type(self) -> &'static str {
        match self {
            Self::Text | Self::Timestamp => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub required: bool,
}

impl ColumnDef {
    fn nullable(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: false,
        }
    }

    fn required(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
        }
    }
}

/// Ordered column list plus optional single-column primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
    pub primary_key: Option<String>,
}

impl TableSchema {
    #[must_use]
    pub fn new(columns: Vec<ColumnDef>, primary_key: Option<String>) -> Self {
        Self {
            columns,
            primary_key,
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Schema of the unified employee table. Column order follows
    /// [`UnifiedRecord`](hrsync_types::UnifiedRecord).
    #[must_use]
    pub fn employees_unified() -> Self {
        use ColumnType::{Boolean, Integer, Real, Text, Timestamp};

        let mut columns = vec![ColumnDef::required(IDENTITY_KEY, Text)];
        for name in [
            "first_name",
            "last_name",
            "full_name",
            "email",
            "department",
            "position",
        ] {
            columns.push(ColumnDef::nullable(name, Text));
        }
        columns.push(ColumnDef::nullable("hire_date", Timestamp));
        columns.push(ColumnDef::nullable("birth_date", Timestamp));
        columns.push(ColumnDef::nullable("gender", Text));
        columns.push(ColumnDef::nullable("employment_type", Text));
        for name in [
            "working_hours",
            "break_time",
            "annual_salary",
            "monthly_salary",
            "hourly_wage",
            "basic_salary",
            "allowances",
            "deductions",
            "net_salary",
            "fixed_premium_wage",
        ] {
            columns.push(ColumnDef::nullable(name, Real));
        }
        for name in [
            "employment_insurance",
            "social_insurance",
            "spouse_info",
            "work_schedule",
            "holidays",
        ] {
            columns.push(ColumnDef::nullable(name, Text));
        }
        columns.extend([
            ColumnDef::required("source_system", Text),
            ColumnDef::nullable("source_systems", Text),
            ColumnDef::required("processed_at", Timestamp),
            ColumnDef::required("record_id", Text),
            ColumnDef::required("data_version", Integer),
            ColumnDef::required("merged_records_count", Integer),
            ColumnDef::required("is_active", Boolean),
        ]);

        Self::new(columns, Some(IDENTITY_KEY.to_string()))
    }
}
