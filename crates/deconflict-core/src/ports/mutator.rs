//! File mutation port (driven/secondary port)
//!
//! Every destructive filesystem operation the resolution engine can perform
//! goes through this trait. That single choke point is what makes the
//! dry-run guarantee ("zero mutation calls") independently testable: hand
//! the engine a recording implementation and assert nothing was asked of it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because mutation errors are adapter-specific.
//! - `replace_file` must never truncate in place; implementations write the
//!   replacement beside the target and rename over it so a failure cannot
//!   leave a half-written original.

use std::path::{Path, PathBuf};

/// A mutation the engine performed or planned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Delete a conflicted duplicate
    Delete(PathBuf),
    /// Replace `original`'s content with the bytes of `source`
    Replace { original: PathBuf, source: PathBuf },
}

/// Port trait for destructive filesystem operations
#[async_trait::async_trait]
pub trait IFileMutator: Send + Sync {
    /// Removes a conflicted file from disk
    async fn remove_file(&self, path: &Path) -> anyhow::Result<()>;

    /// Atomically replaces `original`'s content with the bytes of `source`
    ///
    /// `source` itself is left untouched; deleting it afterwards is a
    /// separate `remove_file` call so a failed replace never loses the
    /// conflicted copy.
    async fn replace_file(&self, original: &Path, source: &Path) -> anyhow::Result<()>;
}
