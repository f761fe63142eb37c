//! Progress reporting port (driven/secondary port)
//!
//! Display-only: the engine pushes scan progress, skip notices and dry-run
//! previews through this trait and never depends on a return value. The CLI
//! backs it with a spinner; tests use `NullReporter`.

use std::path::Path;

/// Port trait for progress and notice display
pub trait IProgressReporter: Send + Sync {
    /// The scanner entered a directory
    fn scanning(&self, dir: &Path);

    /// A path was skipped with a non-fatal error (permission denied, ...)
    fn skipped_path(&self, path: &Path, why: &str);

    /// A free-form notice (excluded mount, corrupt-ledger backup, ...)
    fn note(&self, message: &str);

    /// Dry-run preview of a deletion that would have happened
    fn pending_deletion(&self, original: &Path, conflicted: &Path);

    /// Scanning finished with the given totals
    fn scan_complete(&self, dirs: u64, files: u64);
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl IProgressReporter for NullReporter {
    fn scanning(&self, _dir: &Path) {}
    fn skipped_path(&self, _path: &Path, _why: &str) {}
    fn note(&self, _message: &str) {}
    fn pending_deletion(&self, _original: &Path, _conflicted: &Path) {}
    fn scan_complete(&self, _dirs: u64, _files: u64) {}
}
