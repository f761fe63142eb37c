//! Error types for the engine
//!
//! Only setup problems are fatal: everything that goes wrong after scanning
//! has started (unreadable entries, failed comparisons, failed deletions)
//! is accumulated per-pair or per-path and surfaced in the run report.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run before or while it executes
#[derive(Debug, Error)]
pub enum EngineError {
    /// None of the given root paths is an existing directory
    #[error("no valid root paths given (checked {0:?})")]
    NoValidRoots(Vec<PathBuf>),

    /// The ledger's directory does not exist or cannot be written
    #[error("ledger path is not writable: {path}")]
    LedgerDirUnwritable { path: PathBuf },

    /// Writing the ledger failed
    #[error("failed to persist ledger to {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// Other I/O failure during setup
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::NoValidRoots(vec![PathBuf::from("/missing")]);
        assert!(err.to_string().contains("/missing"));

        let err = EngineError::LedgerDirUnwritable {
            path: PathBuf::from("/ro/out.json"),
        };
        assert_eq!(err.to_string(), "ledger path is not writable: /ro/out.json");
    }
}
