//! Source system identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// External platform a record was extracted from.
///
/// Assigned once by the transformation engine and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// Groupware workflow system.
    Garoon,
    /// HR platform.
    Smarthr,
    /// Timekeeping platform.
    Jobcan,
    /// Accounting / payroll platform.
    Pca,
    /// Spreadsheet feed.
    Sheets,
}

impl SourceSystem {
    /// Every supported source, in declaration order.
    pub const ALL: [SourceSystem; 5] = [
        Self::Garoon,
        Self::Smarthr,
        Self::Jobcan,
        Self::Pca,
        Self::Sheets,
    ];

    /// Wire-format name used in records, process names, and config.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Garoon => "garoon",
            Self::Smarthr => "smarthr",
            Self::Jobcan => "jobcan",
            Self::Pca => "pca",
            Self::Sheets => "sheets",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a source name does not match any known system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source system '{0}'")]
pub struct UnknownSourceSystem(pub String);

impl FromStr for SourceSystem {
    type Err = UnknownSourceSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "garoon" => Ok(Self::Garoon),
            "smarthr" => Ok(Self::Smarthr),
            "jobcan" => Ok(Self::Jobcan),
            "pca" | "pcacloud" => Ok(Self::Pca),
            "sheets" | "sheets_hr" | "googlesheets" => Ok(Self::Sheets),
            _ => Err(UnknownSourceSystem(s.to_string())),
        }
    }
}
