//! Warehouse trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrsync_types::Row;

use crate::error::Result;
use crate::schema::TableSchema;

/// Storage contract used by the load stage and quality assessment.
///
/// Rows are column-name keyed JSON maps; values are converted according to
/// the column types in the [`TableSchema`] passed alongside them.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn Warehouse>`.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create `table` with `schema` if it does not exist. Never alters an
    /// existing table.
    async fn ensure_table(&self, table: &str, schema: &TableSchema) -> Result<()>;

    /// Insert all `rows` into `table` in one transaction. Returns rows written.
    async fn bulk_insert(&self, table: &str, schema: &TableSchema, rows: &[Row]) -> Result<u64>;

    /// Upsert every row of `staging` into `target` in a single statement,
    /// matching on `key`. Returns rows affected.
    async fn merge_upsert(
        &self,
        target: &str,
        staging: &str,
        schema: &TableSchema,
        key: &str,
    ) -> Result<u64>;

    /// Drop `table` if it exists.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Rows of `table` whose timestamp `column` is at or after `since`.
    /// A missing table yields no rows.
    async fn scan_since(
        &self,
        table: &str,
        schema: &TableSchema,
        column: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn Warehouse) {}
    }
}
