//! Checkpoint persistence for hrsync.
//!
//! Provides the [`CheckpointStore`] trait and a [`SqliteCheckpointStore`]
//! implementation for extraction cursors, run history, quarantined
//! records, and the quality-alert audit log.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod sqlite;

pub use backend::CheckpointStore;
pub use error::StateError;
pub use sqlite::SqliteCheckpointStore;
