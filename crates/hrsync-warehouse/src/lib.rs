//! Warehouse side of hrsync.
//!
//! [`Warehouse`] is the contract the load stage and quality assessment
//! talk to. [`SqliteWarehouse`] is an embedded implementation of it.
//! Table shapes are declared once as [`TableSchema`] values.

#![warn(clippy::pedantic)]

pub mod ddl;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod warehouse;

pub use error::WarehouseError;
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use sqlite::SqliteWarehouse;
pub use warehouse::Warehouse;
