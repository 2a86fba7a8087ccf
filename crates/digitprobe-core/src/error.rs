//! Error taxonomy.
//!
//! Only conditions that make a run meaningless are errors. Everything that
//! merely weakens a metric is recorded as a [`crate::report::ReportNote`]
//! inside the report so batch pipelines keep going.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by digitprobe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The caller broke an input contract (bad alphabet, empty sequence,
    /// malformed report, unknown baseline). Fatal; nothing is computed.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProbeError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error: 2 for contract violations, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ContractViolation(_) => 2,
            Self::Io { .. } | Self::Serialization(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
