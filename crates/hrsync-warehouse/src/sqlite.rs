//! Embedded `SQLite` implementation of [`Warehouse`].
//!
//! Uses a single `Mutex<Connection>`; each call holds the lock for the
//! duration of one statement or one transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrsync_types::Row;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;

use crate::ddl;
use crate::error::{Result, WarehouseError};
use crate::schema::{ColumnDef, ColumnType, TableSchema};
use crate::warehouse::Warehouse;

/// Fixed-width UTC timestamp text. Lexical order equals time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
}

impl SqliteWarehouse {
    /// Open or create a warehouse database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Io`] if the directory can't be created,
    /// or [`WarehouseError::Open`] if the database can't be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(WarehouseError::Open)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory warehouse (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Open`] if `SQLite` can't allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(WarehouseError::Open)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| WarehouseError::LockPoisoned)
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| WarehouseError::sqlite("table_exists", table, e))
    }
}

fn to_sql_value(col: &ColumnDef, value: Option<&Value>) -> Result<SqlValue> {
    let value = match value {
        None | Some(Value::Null) => {
            if col.required {
                return Err(WarehouseError::conversion(&col.name, "required column is null"));
            }
            return Ok(SqlValue::Null);
        }
        Some(v) => v,
    };

    let mismatch = || WarehouseError::conversion(&col.name, format!("unexpected value {value}"));

    match col.ty {
        ColumnType::Text => match value {
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(SqlValue::Text(value.to_string())),
            _ => Err(mismatch()),
        },
        ColumnType::Integer => match value {
            Value::Number(n) => n.as_i64().map(SqlValue::Integer).ok_or_else(mismatch),
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::String(s) => s.trim().parse().map(SqlValue::Integer).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ColumnType::Real => match value {
            Value::Number(n) => n.as_f64().map(SqlValue::Real).ok_or_else(mismatch),
            Value::String(s) => s.trim().parse().map(SqlValue::Real).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => n
                .as_i64()
                .map(|i| SqlValue::Integer(i64::from(i != 0)))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::Timestamp => match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| SqlValue::Text(format_timestamp(ts.with_timezone(&Utc))))
                .map_err(|e| WarehouseError::conversion(&col.name, format!("'{s}': {e}"))),
            _ => Err(mismatch()),
        },
    }
}

#[allow(clippy::cast_precision_loss)]
fn from_sql_value(col: &ColumnDef, value: SqlValue) -> Result<Value> {
    let converted = match (col.ty, value) {
        (_, SqlValue::Null) => Some(Value::Null),
        (ColumnType::Text | ColumnType::Timestamp, SqlValue::Text(s)) => Some(Value::String(s)),
        (ColumnType::Text, SqlValue::Integer(i)) => Some(Value::String(i.to_string())),
        (ColumnType::Text, SqlValue::Real(f)) => Some(Value::String(f.to_string())),
        (ColumnType::Integer, SqlValue::Integer(i)) => Some(Value::from(i)),
        (ColumnType::Real, SqlValue::Real(f)) => Some(Value::from(f)),
        (ColumnType::Real, SqlValue::Integer(i)) => Some(Value::from(i as f64)),
        (ColumnType::Boolean, SqlValue::Integer(i)) => Some(Value::Bool(i != 0)),
        _ => None,
    };
    converted.ok_or_else(|| {
        WarehouseError::conversion(&col.name, format!("stored value does not match {:?}", col.ty))
    })
}

fn row_values(schema: &TableSchema, row: &Row) -> Result<Vec<SqlValue>> {
    if let Some(unknown) = row.keys().find(|k| schema.column(k).is_none()) {
        return Err(WarehouseError::Schema(format!(
            "row has undeclared column '{unknown}'"
        )));
    }
    schema
        .columns
        .iter()
        .map(|col| to_sql_value(col, row.get(&col.name)))
        .collect()
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn ensure_table(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let sql = ddl::create_table_sql(table, schema)?;
        let conn = self.lock_conn()?;
        conn.execute_batch(&sql)
            .map_err(|e| WarehouseError::sqlite("ensure_table", table, e))?;
        tracing::debug!(table, "ensured table");
        Ok(())
    }

    async fn bulk_insert(&self, table: &str, schema: &TableSchema, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = ddl::insert_sql(table, schema)?;
        let params = rows
            .iter()
            .map(|row| row_values(schema, row))
            .collect::<Result<Vec<_>>>()?;

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| WarehouseError::sqlite("bulk_insert: begin tx", table, e))?;
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| WarehouseError::sqlite("bulk_insert: prepare", table, e))?;

        let mut count = 0u64;
        for values in params {
            stmt.execute(rusqlite::params_from_iter(values))
                .map_err(|e| WarehouseError::sqlite("bulk_insert: execute", table, e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| WarehouseError::sqlite("bulk_insert: commit", table, e))?;

        tracing::debug!(table, rows = count, "bulk insert committed");
        Ok(count)
    }

    async fn merge_upsert(
        &self,
        target: &str,
        staging: &str,
        schema: &TableSchema,
        key: &str,
    ) -> Result<u64> {
        let sql = ddl::upsert_sql(target, staging, schema, key)?;
        let conn = self.lock_conn()?;
        let affected = conn
            .execute(&sql, [])
            .map_err(|e| WarehouseError::sqlite("merge_upsert", target, e))?;
        tracing::debug!(target, staging, rows = affected, "merge upsert applied");
        Ok(affected as u64)
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = ddl::drop_table_sql(table)?;
        let conn = self.lock_conn()?;
        conn.execute_batch(&sql)
            .map_err(|e| WarehouseError::sqlite("drop_table", table, e))?;
        Ok(())
    }

    async fn scan_since(
        &self,
        table: &str,
        schema: &TableSchema,
        column: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Row>> {
        ddl::validate_identifier(table)?;
        match schema.column(column) {
            Some(col) if col.ty == ColumnType::Timestamp => {}
            _ => {
                return Err(WarehouseError::Schema(format!(
                    "'{column}' is not a timestamp column"
                )))
            }
        }

        let conn = self.lock_conn()?;
        if !Self::table_exists(&conn, table)? {
            return Ok(Vec::new());
        }

        let cols = schema
            .column_names()
            .map(|c| pg_escape::quote_identifier(c).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {cols} FROM {} WHERE {} >= ?1 ORDER BY rowid",
            pg_escape::quote_identifier(table),
            pg_escape::quote_identifier(column),
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| WarehouseError::sqlite("scan_since: prepare", table, e))?;
        let width = schema.columns.len();
        let raw_rows = stmt
            .query_map([format_timestamp(since)], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| WarehouseError::sqlite("scan_since: query", table, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| WarehouseError::sqlite("scan_since: read", table, e))?;

        raw_rows
            .into_iter()
            .map(|values| {
                schema
                    .columns
                    .iter()
                    .zip(values)
                    .map(|(col, v)| Ok((col.name.clone(), from_sql_value(col, v)?)))
                    .collect::<Result<Row>>()
            })
            .collect()
    }
}
