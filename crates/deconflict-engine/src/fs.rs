//! File mutation adapters
//!
//! [`LocalFileMutator`] performs real deletions and replacements;
//! [`DryRunMutator`] records what would have happened and touches nothing.
//! The CLI wires in the dry-run implementation whenever `--dry-run` is
//! given, so even a bug in the engine's own dry-run gating cannot mutate
//! the tree.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use deconflict_core::ports::{IFileMutator, Mutation};

/// Mutator that performs real filesystem operations
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileMutator;

impl LocalFileMutator {
    /// Creates a new `LocalFileMutator`
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IFileMutator for LocalFileMutator {
    async fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        debug!(path = %path.display(), "removing file");
        tokio::fs::remove_file(path).await?;
        info!(path = %path.display(), "file removed");
        Ok(())
    }

    async fn replace_file(&self, original: &Path, source: &Path) -> anyhow::Result<()> {
        debug!(
            original = %original.display(),
            source = %source.display(),
            "replacing original content"
        );

        let data = tokio::fs::read(source).await?;

        // Write beside the original, then rename over it. The rename stays
        // on one filesystem, so the original is swapped whole and is never
        // observable in a truncated state.
        let tmp = {
            let mut p = original.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, original).await?;

        info!(original = %original.display(), bytes = data.len(), "original replaced");
        Ok(())
    }
}

/// Mutator that records planned mutations without performing any
///
/// The recorded plan doubles as the test probe for the dry-run guarantee:
/// after a dry run it must be empty, because the engine previews actions
/// itself and never reaches the mutation port.
#[derive(Debug, Default)]
pub struct DryRunMutator {
    planned: Mutex<Vec<Mutation>>,
}

impl DryRunMutator {
    /// Creates a new `DryRunMutator`
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutations that were requested of this mutator
    pub fn planned(&self) -> Vec<Mutation> {
        self.planned
            .lock()
            .expect("planned mutation lock poisoned")
            .clone()
    }
}

#[async_trait::async_trait]
impl IFileMutator for DryRunMutator {
    async fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.planned
            .lock()
            .expect("planned mutation lock poisoned")
            .push(Mutation::Delete(path.to_path_buf()));
        Ok(())
    }

    async fn replace_file(&self, original: &Path, source: &Path) -> anyhow::Result<()> {
        self.planned
            .lock()
            .expect("planned mutation lock poisoned")
            .push(Mutation::Replace {
                original: original.to_path_buf(),
                source: source.to_path_buf(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bye.txt");
        std::fs::write(&path, b"x").unwrap();

        LocalFileMutator::new().remove_file(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let result = LocalFileMutator::new()
            .remove_file(&dir.path().join("absent.txt"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_replace_swaps_content_and_keeps_source() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a.txt");
        let source = dir.path().join("a [conflicted].txt");
        std::fs::write(&original, b"old").unwrap();
        std::fs::write(&source, b"new content").unwrap();

        LocalFileMutator::new()
            .replace_file(&original, &source)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&original).unwrap(), b"new content");
        assert!(source.exists(), "source is only removed by a separate call");
    }

    #[tokio::test]
    async fn test_dry_run_mutator_records_and_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a.txt");
        let conflicted = dir.path().join("a [conflicted].txt");
        std::fs::write(&original, b"old").unwrap();
        std::fs::write(&conflicted, b"new").unwrap();

        let mutator = DryRunMutator::new();
        mutator.remove_file(&conflicted).await.unwrap();
        mutator.replace_file(&original, &conflicted).await.unwrap();

        assert_eq!(std::fs::read(&original).unwrap(), b"old");
        assert_eq!(std::fs::read(&conflicted).unwrap(), b"new");
        assert_eq!(
            mutator.planned(),
            vec![
                Mutation::Delete(conflicted.clone()),
                Mutation::Replace {
                    original,
                    source: conflicted,
                },
            ]
        );
    }
}
