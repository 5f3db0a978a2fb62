//! SQL text builders for table lifecycle and the staging upsert.
//!
//! Every identifier is validated before interpolation, then quoted with
//! `pg_escape::quote_identifier` (double-quote rules shared with `SQLite`).

use pg_escape::quote_identifier;

use crate::error::{Result, WarehouseError};
use crate::schema::TableSchema;

/// Reject identifiers that are not plain `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Errors
///
/// Returns [`WarehouseError::Schema`] describing the first offending character.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(WarehouseError::Schema("identifier must not be empty".into()));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(WarehouseError::Schema(format!(
            "identifier '{name}' must start with a letter or underscore, got '{first}'"
        )));
    }
    if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(WarehouseError::Schema(format!(
            "identifier '{name}' contains invalid character '{ch}'"
        )));
    }
    Ok(())
}

fn validate_schema(schema: &TableSchema) -> Result<()> {
    if schema.columns.is_empty() {
        return Err(WarehouseError::Schema("schema has no columns".into()));
    }
    for name in schema.column_names() {
        validate_identifier(name)?;
    }
    if let Some(pk) = &schema.primary_key {
        if schema.column(pk).is_none() {
            return Err(WarehouseError::Schema(format!(
                "primary key '{pk}' is not a declared column"
            )));
        }
    }
    Ok(())
}

fn column_list(schema: &TableSchema) -> String {
    schema
        .column_names()
        .map(|c| quote_identifier(c).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE IF NOT EXISTS` for `schema`. Existing tables are never altered.
///
/// # Errors
///
/// Returns [`WarehouseError::Schema`] for invalid identifiers.
pub fn create_table_sql(table: &str, schema: &TableSchema) -> Result<String> {
    validate_identifier(table)?;
    validate_schema(schema)?;

    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            let not_null = if col.required { " NOT NULL" } else { "" };
            format!(
                "{} {}{}",
                quote_identifier(&col.name),
                col.ty.sqlite_type(),
                not_null
            )
        })
        .collect();
    if let Some(pk) = &schema.primary_key {
        parts.push(format!("PRIMARY KEY ({})", quote_identifier(pk)));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table),
        parts.join(", ")
    ))
}

/// Parameterized single-row insert with one `?N` placeholder per column.
///
/// # Errors
///
/// Returns [`WarehouseError::Schema`] for invalid identifiers.
pub fn insert_sql(table: &str, schema: &TableSchema) -> Result<String> {
    validate_identifier(table)?;
    validate_schema(schema)?;

    let placeholders = (1..=schema.columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        column_list(schema),
        placeholders
    ))
}

/// Set-based upsert from `staging` into `target` keyed by `key`.
///
/// Matching rows update every non-key column; the rest insert. The
/// `WHERE true` disambiguates `ON CONFLICT` after a `SELECT` in `SQLite`.
///
/// # Errors
///
/// Returns [`WarehouseError::Schema`] for invalid identifiers or an
/// unknown key column.
pub fn upsert_sql(target: &str, staging: &str, schema: &TableSchema, key: &str) -> Result<String> {
    validate_identifier(target)?;
    validate_identifier(staging)?;
    validate_schema(schema)?;
    if schema.column(key).is_none() {
        return Err(WarehouseError::Schema(format!(
            "upsert key '{key}' is not a declared column"
        )));
    }

    let cols = column_list(schema);
    let update_cols: Vec<String> = schema
        .column_names()
        .filter(|name| *name != key)
        .map(|name| {
            format!(
                "{} = excluded.{}",
                quote_identifier(name),
                quote_identifier(name)
            )
        })
        .collect();

    let conflict = if update_cols.is_empty() {
        format!("ON CONFLICT ({}) DO NOTHING", quote_identifier(key))
    } else {
        format!(
            "ON CONFLICT ({}) DO UPDATE SET {}",
            quote_identifier(key),
            update_cols.join(", ")
        )
    };

    Ok(format!(
        "INSERT INTO {} ({cols}) SELECT {cols} FROM {} WHERE true {conflict}",
        quote_identifier(target),
        quote_identifier(staging),
    ))
}

/// `DROP TABLE IF EXISTS`.
///
/// # Errors
///
/// Returns [`WarehouseError::Schema`] for an invalid identifier.
pub fn drop_table_sql(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {}", quote_identifier(table)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnType};

    fn small_schema() -> TableSchema {
        TableSchema::new(
            vec![
                ColumnDef {
                    name: "employee_id".into(),
                    ty: ColumnType::Text,
                    required: true,
                },
                ColumnDef {
                    name: "first_name".into(),
                    ty: ColumnType::Text,
                    required: false,
                },
                ColumnDef {
                    name: "annual_salary".into(),
                    ty: ColumnType::Real,
                    required: false,
                },
            ],
            Some("employee_id".into()),
        )
    }

    #[test]
    fn validate_identifier_rules() {
        assert!(validate_identifier("employees_unified").is_ok());
        assert!(validate_identifier("_staging_1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        let err = validate_identifier("users; DROP TABLE x").unwrap_err();
        assert!(err.to_string().contains("invalid character ';'"), "got: {err}");
    }

    #[test]
    fn create_table_includes_primary_key_and_not_null() {
        let sql = create_table_sql("employees_unified", &small_schema()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS employees_unified (employee_id TEXT NOT NULL, \
             first_name TEXT, annual_salary REAL, PRIMARY KEY (employee_id))"
        );
    }

    #[test]
    fn create_table_without_primary_key() {
        let mut schema = small_schema();
        schema.primary_key = None;
        let sql = create_table_sql("t", &schema).unwrap();
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn insert_uses_numbered_placeholders() {
        let sql = insert_sql("stage_1", &small_schema()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO stage_1 (employee_id, first_name, annual_salary) VALUES (?1, ?2, ?3)"
        );
    }

    #[test]
    fn upsert_updates_non_key_columns() {
        let sql = upsert_sql("employees_unified", "stage_1", &small_schema(), "employee_id").unwrap();
        assert_eq!(
            sql,
            "INSERT INTO employees_unified (employee_id, first_name, annual_salary) \
             SELECT employee_id, first_name, annual_salary FROM stage_1 WHERE true \
             ON CONFLICT (employee_id) DO UPDATE SET first_name = excluded.first_name, \
             annual_salary = excluded.annual_salary"
        );
    }

    #[test]
    fn upsert_key_only_schema_does_nothing_on_conflict() {
        let schema = TableSchema::new(
            vec![ColumnDef {
                name: "employee_id".into(),
                ty: ColumnType::Text,
                required: true,
            }],
            Some("employee_id".into()),
        );
        let sql = upsert_sql("t", "s", &schema, "employee_id").unwrap();
        assert!(sql.ends_with("ON CONFLICT (employee_id) DO NOTHING"), "got: {sql}");
    }

    #[test]
    fn upsert_rejects_unknown_key() {
        let err = upsert_sql("t", "s", &small_schema(), "email").unwrap_err();
        assert!(matches!(err, WarehouseError::Schema(_)));
    }

    #[test]
    fn drop_rejects_injection() {
        assert_eq!(drop_table_sql("stage_1").unwrap(), "DROP TABLE IF EXISTS stage_1");
        assert!(drop_table_sql("x\"; --").is_err());
    }

    #[test]
    fn unified_schema_builds() {
        let schema = TableSchema::employees_unified();
        let sql = create_table_sql("employees_unified", &schema).unwrap();
        assert!(sql.contains("PRIMARY KEY (employee_id)"));
        assert!(sql.contains("merged_records_count INTEGER NOT NULL"));
    }
}
