//! Shared hrsync data model.
//!
//! Pure data types used by the state, warehouse, and engine crates. Kept
//! free of I/O so every crate can depend on it without cycles.

pub mod cursor;
pub mod error;
pub mod quality;
pub mod record;
pub mod source;
pub mod state;

pub use cursor::ExtractionCursor;
pub use error::{ConnectorError, ErrorCategory};
pub use quality::{Alert, AlertKind, QualityReport, Severity};
pub use record::{RawRecord, Row, UnifiedRecord, IDENTITY_KEY};
pub use source::{SourceSystem, UnknownSourceSystem};
pub use state::{ProcessName, QuarantinedRecord, RunStats, RunStatus};
