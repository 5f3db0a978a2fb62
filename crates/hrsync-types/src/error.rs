//! Typed connector error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    #[error("config")]
    Config,
    #[error("auth")]
    Auth,
    #[error("transient_network")]
    TransientNetwork,
    #[error("timeout")]
    Timeout,
    #[error("data")]
    Data,
    #[error("internal")]
    Internal,
}

/// Failure reported by a source connector while fetching a page.
///
/// Code follows the SCREAMING_SNAKE_CASE convention
/// (e.g. `"HTTP_503"`, `"FETCH_TIMEOUT"`).
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error(
    "[{category}] {code} ({retryability}): {message}",
    retryability = if *.retryable { "retryable" } else { "fatal" }
)]
pub struct ConnectorError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ConnectorError {
    fn build(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Configuration error (not retryable).
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Config, code, message, false)
    }

    /// Authentication error (not retryable).
    pub fn auth(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Auth, code, message, false)
    }

    /// Network failure or non-2xx response (retryable on a later invocation).
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::TransientNetwork, code, message, true)
    }

    /// Fetch exceeded its deadline (retryable on a later invocation).
    pub fn timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Timeout, code, message, true)
    }

    /// Response body could not be interpreted (not retryable).
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Data, code, message, false)
    }

    /// Connector bug or unexpected state (not retryable).
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Internal, code, message, false)
    }
}
