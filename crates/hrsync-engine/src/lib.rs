//! Pipeline engine for hrsync: resumable extraction, transformation,
//! duplicate merge, staging upsert load, and quality assessment.

pub mod config;
pub mod connector;
pub mod errors;
pub mod extract;
pub mod load;
pub mod mapping;
pub mod merge;
pub mod notifier;
pub mod orchestrator;
pub mod quality;
pub(crate) mod quarantine;
pub mod result;
pub mod transform;
pub mod validation;

pub use connector::{ConnectorRegistry, FileFeedConnector, Page, PageRequest, SourceConnector};
pub use errors::{LoadError, PipelineError};
pub use notifier::{LogNotifier, Notifier};
pub use orchestrator::{Pipeline, SyncRequest};
pub use quality::QualityMonitor;
pub use result::{SyncResponse, SyncStatus};
