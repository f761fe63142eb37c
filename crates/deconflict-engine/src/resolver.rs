//! The resolution state machine
//!
//! Consumes a pair's comparison verdict and drives it to a per-run
//! terminal state, consulting the injected decision source where an
//! operator choice is needed and the mutation port for every destructive
//! action. Under dry-run the engine previews and never reaches the
//! mutation port.
//!
//! Verdict x flags -> outcome:
//! - Orphaned: recorded, never deleted, never auto-resolved
//! - Identical: auto-delete, confirm-then-delete, or preview (dry-run)
//! - Different: pending-review, or the interactive keep/skip/view loop
//! - Error: recorded and surfaced; nothing is deleted

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use deconflict_core::domain::{
    CompareVerdict, Comparison, ConflictRecord, MatchedPair, ResolutionReason,
};
use deconflict_core::ports::{Decision, IDecisionSource, IFileMutator, IProgressReporter, PairSummary};

use crate::diff::DiffViewer;

/// What resolving one pair did
#[derive(Debug, Default)]
pub struct PairOutcome {
    /// The conflicted file that was deleted (or would be, under dry-run)
    pub deleted: Option<PathBuf>,
    /// A per-pair failure that should be surfaced in the summary
    pub error: Option<String>,
}

/// Drives each pair to its per-run terminal state
pub struct ResolutionEngine {
    auto_delete: bool,
    resolve: bool,
    dry_run: bool,
    mutator: Arc<dyn IFileMutator>,
    decisions: Arc<dyn IDecisionSource>,
    reporter: Arc<dyn IProgressReporter>,
    diff: Option<DiffViewer>,
}

impl ResolutionEngine {
    pub fn new(
        auto_delete: bool,
        resolve: bool,
        dry_run: bool,
        mutator: Arc<dyn IFileMutator>,
        decisions: Arc<dyn IDecisionSource>,
        reporter: Arc<dyn IProgressReporter>,
        diff: Option<DiffViewer>,
    ) -> Self {
        Self {
            auto_delete,
            resolve,
            dry_run,
            mutator,
            decisions,
            reporter,
            diff,
        }
    }

    /// Resolves one pair, updating its ledger record in place
    ///
    /// `comparison` is `None` exactly when the pair is orphaned.
    pub async fn resolve_pair(
        &self,
        pair: &MatchedPair,
        comparison: Option<&Comparison>,
        record: &mut ConflictRecord,
    ) -> PairOutcome {
        let mut outcome = PairOutcome::default();

        let Some(original) = pair.original.as_deref() else {
            debug!(conflicted = %pair.conflicted_path().display(), "orphaned conflict recorded");
            record.mark_active(ResolutionReason::Orphaned);
            return outcome;
        };

        let Some(cmp) = comparison else {
            // A matched pair always has a comparison; treat its absence
            // as a comparison failure rather than guessing.
            record.mark_active(ResolutionReason::CompareError);
            outcome.error = Some("pair was never compared".to_string());
            return outcome;
        };

        match cmp.verdict {
            CompareVerdict::Error => {
                warn!(
                    original = %original.display(),
                    conflicted = %pair.conflicted_path().display(),
                    reason = %cmp.reason,
                    "comparison failed"
                );
                record.mark_active(ResolutionReason::CompareError);
                outcome.error = Some(cmp.reason.clone());
            }
            CompareVerdict::Identical => {
                self.handle_identical(original, pair, record, &mut outcome)
                    .await;
            }
            CompareVerdict::Different => {
                self.handle_different(original, pair, cmp, record, &mut outcome)
                    .await;
            }
        }

        outcome
    }

    async fn handle_identical(
        &self,
        original: &Path,
        pair: &MatchedPair,
        record: &mut ConflictRecord,
        outcome: &mut PairOutcome,
    ) {
        let conflicted = pair.conflicted_path();

        if self.dry_run {
            self.reporter.pending_deletion(original, conflicted);
            outcome.deleted = Some(conflicted.to_path_buf());
            record.mark_active(ResolutionReason::PendingReview);
            return;
        }

        let confirmed = if self.auto_delete {
            true
        } else {
            match self.decisions.confirm_delete(conflicted).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(error = %e, "confirmation failed; leaving pair in place");
                    false
                }
            }
        };

        if !confirmed {
            record.mark_active(ResolutionReason::Skipped);
            return;
        }

        match self.mutator.remove_file(conflicted).await {
            Ok(()) => {
                info!(conflicted = %conflicted.display(), "identical duplicate deleted");
                record.mark_resolved(ResolutionReason::IdenticalAutoDeleted);
                outcome.deleted = Some(conflicted.to_path_buf());
            }
            Err(e) => {
                warn!(conflicted = %conflicted.display(), error = %e, "deletion failed");
                record.mark_active(ResolutionReason::DeleteFailed);
                outcome.error = Some(format!("delete {}: {e}", conflicted.display()));
            }
        }
    }

    async fn handle_different(
        &self,
        original: &Path,
        pair: &MatchedPair,
        cmp: &Comparison,
        record: &mut ConflictRecord,
        outcome: &mut PairOutcome,
    ) {
        let conflicted = pair.conflicted_path();

        if !self.resolve || self.dry_run {
            if self.resolve && self.dry_run {
                self.reporter.note(&format!(
                    "Would offer resolution for {} vs {}",
                    original.display(),
                    conflicted.display()
                ));
            }
            record.mark_active(ResolutionReason::PendingReview);
            return;
        }

        let summary = PairSummary {
            original: original.to_path_buf(),
            conflicted: conflicted.to_path_buf(),
            size_original: cmp.size_original,
            size_conflicted: cmp.size_conflicted,
            modified_original: cmp.modified_original,
            modified_conflicted: cmp.modified_conflicted,
            reason: cmp.reason.clone(),
        };

        loop {
            let decision = match self.decisions.decide(&summary).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "decision source failed; skipping pair");
                    Decision::Skip
                }
            };
            debug!(decision = %decision, conflicted = %conflicted.display(), "operator decision");

            match decision {
                Decision::View => {
                    match &self.diff {
                        Some(viewer) => {
                            if let Err(e) = viewer.show(original, conflicted) {
                                self.reporter.note(&format!("Could not show diff: {e}"));
                            }
                        }
                        None => self.reporter.note("No diff tool available"),
                    }
                    // Non-terminal: ask again.
                }
                Decision::Skip => {
                    record.mark_active(ResolutionReason::Skipped);
                    return;
                }
                Decision::KeepOriginal => {
                    match self.mutator.remove_file(conflicted).await {
                        Ok(()) => {
                            info!(conflicted = %conflicted.display(), "kept original");
                            record.mark_resolved(ResolutionReason::ResolvedKeptOriginal);
                            outcome.deleted = Some(conflicted.to_path_buf());
                        }
                        Err(e) => {
                            warn!(error = %e, "deletion failed");
                            record.mark_active(ResolutionReason::DeleteFailed);
                            outcome.error =
                                Some(format!("delete {}: {e}", conflicted.display()));
                        }
                    }
                    return;
                }
                Decision::KeepConflicted => {
                    let result = async {
                        self.mutator.replace_file(original, conflicted).await?;
                        self.mutator.remove_file(conflicted).await
                    }
                    .await;
                    match result {
                        Ok(()) => {
                            info!(original = %original.display(), "kept conflicted content");
                            record.mark_resolved(ResolutionReason::ResolvedKeptConflicted);
                            outcome.deleted = Some(conflicted.to_path_buf());
                        }
                        Err(e) => {
                            warn!(error = %e, "replace failed");
                            record.mark_active(ResolutionReason::DeleteFailed);
                            outcome.error =
                                Some(format!("replace {}: {e}", original.display()));
                        }
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deconflict_core::domain::{CompareMethod, ConflictCandidate, ConflictStatus};
    use deconflict_core::ports::{NullReporter, ScriptedDecisionSource};
    use tempfile::TempDir;

    use crate::fs::{DryRunMutator, LocalFileMutator};

    fn engine(
        auto_delete: bool,
        resolve: bool,
        dry_run: bool,
        mutator: Arc<dyn IFileMutator>,
        decisions: Arc<dyn IDecisionSource>,
    ) -> ResolutionEngine {
        ResolutionEngine::new(
            auto_delete,
            resolve,
            dry_run,
            mutator,
            decisions,
            Arc::new(NullReporter),
            None,
        )
    }

    fn matched_pair(dir: &TempDir, original: &str, conflicted: &str) -> MatchedPair {
        let path = dir.path().join(conflicted);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        MatchedPair::new(
            ConflictCandidate::new(path, size, None),
            Some(dir.path().join(original)),
        )
    }

    fn comparison(verdict: CompareVerdict) -> Comparison {
        Comparison {
            verdict,
            method: CompareMethod::Hash,
            reason: match verdict {
                CompareVerdict::Identical => "files are identical".to_string(),
                CompareVerdict::Different => "different content (hash mismatch)".to_string(),
                CompareVerdict::Error => "cannot stat".to_string(),
            },
            size_original: 2,
            size_conflicted: 2,
            modified_original: None,
            modified_conflicted: None,
            hash_original: None,
            hash_conflicted: None,
        }
    }

    fn record_for(pair: &MatchedPair) -> ConflictRecord {
        ConflictRecord::new(
            pair.original
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            pair.conflicted_path().display().to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_identical_auto_delete_removes_conflicted_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join("a [conflicted].txt"), b"hi").unwrap();
        let pair = matched_pair(&dir, "a.txt", "a [conflicted].txt");
        let mut record = record_for(&pair);

        let engine = engine(
            true,
            false,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::skip_all()),
        );
        let outcome = engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Identical)), &mut record)
            .await;

        assert!(!dir.path().join("a [conflicted].txt").exists());
        assert!(dir.path().join("a.txt").exists());
        assert_eq!(record.reason, ResolutionReason::IdenticalAutoDeleted);
        assert_eq!(record.status, ConflictStatus::Resolved);
        assert!(outcome.deleted.is_some());
    }

    #[tokio::test]
    async fn test_identical_declined_confirmation_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join("a [conflicted].txt"), b"hi").unwrap();
        let pair = matched_pair(&dir, "a.txt", "a [conflicted].txt");
        let mut record = record_for(&pair);

        let engine = engine(
            false,
            false,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new([], false)),
        );
        engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Identical)), &mut record)
            .await;

        assert!(dir.path().join("a [conflicted].txt").exists());
        assert_eq!(record.reason, ResolutionReason::Skipped);
        assert!(record.is_active());
    }

    #[tokio::test]
    async fn test_identical_dry_run_never_reaches_mutator() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join("a [conflicted].txt"), b"hi").unwrap();
        let pair = matched_pair(&dir, "a.txt", "a [conflicted].txt");
        let mut record = record_for(&pair);

        let mutator = Arc::new(DryRunMutator::new());
        let engine = engine(
            true,
            false,
            true,
            mutator.clone(),
            Arc::new(ScriptedDecisionSource::skip_all()),
        );
        let outcome = engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Identical)), &mut record)
            .await;

        assert!(mutator.planned().is_empty());
        assert!(dir.path().join("a [conflicted].txt").exists());
        assert_eq!(outcome.deleted, Some(dir.path().join("a [conflicted].txt")));
    }

    #[tokio::test]
    async fn test_orphan_ignores_auto_delete_and_resolve() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("orphan [conflicted].txt"), b"x").unwrap();
        let pair = MatchedPair::new(
            ConflictCandidate::new(dir.path().join("orphan [conflicted].txt"), 1, None),
            None,
        );
        let mut record = record_for(&pair);

        let engine = engine(
            true,
            true,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new(
                [Decision::KeepOriginal],
                true,
            )),
        );
        engine.resolve_pair(&pair, None, &mut record).await;

        assert!(dir.path().join("orphan [conflicted].txt").exists());
        assert_eq!(record.reason, ResolutionReason::Orphaned);
    }

    #[tokio::test]
    async fn test_different_without_resolve_is_pending_review() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"v1").unwrap();
        std::fs::write(dir.path().join("b (conflicted).txt"), b"v2").unwrap();
        let pair = matched_pair(&dir, "b.txt", "b (conflicted).txt");
        let mut record = record_for(&pair);

        let engine = engine(
            true, // auto-delete must not touch different pairs
            false,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::skip_all()),
        );
        engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Different)), &mut record)
            .await;

        assert!(dir.path().join("b.txt").exists());
        assert!(dir.path().join("b (conflicted).txt").exists());
        assert_eq!(record.reason, ResolutionReason::PendingReview);
        assert!(record.is_active());
    }

    #[tokio::test]
    async fn test_resolve_keep_original() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"v1").unwrap();
        std::fs::write(dir.path().join("b (conflicted).txt"), b"v2").unwrap();
        let pair = matched_pair(&dir, "b.txt", "b (conflicted).txt");
        let mut record = record_for(&pair);

        let engine = engine(
            false,
            true,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new([Decision::KeepOriginal], false)),
        );
        engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Different)), &mut record)
            .await;

        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"v1");
        assert!(!dir.path().join("b (conflicted).txt").exists());
        assert_eq!(record.reason, ResolutionReason::ResolvedKeptOriginal);
    }

    #[tokio::test]
    async fn test_resolve_keep_conflicted_replaces_then_deletes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"v1").unwrap();
        std::fs::write(dir.path().join("b (conflicted).txt"), b"v2").unwrap();
        let pair = matched_pair(&dir, "b.txt", "b (conflicted).txt");
        let mut record = record_for(&pair);

        let engine = engine(
            false,
            true,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new(
                [Decision::KeepConflicted],
                false,
            )),
        );
        engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Different)), &mut record)
            .await;

        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"v2");
        assert!(!dir.path().join("b (conflicted).txt").exists());
        assert_eq!(record.reason, ResolutionReason::ResolvedKeptConflicted);
    }

    #[tokio::test]
    async fn test_view_loops_back_to_another_decision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"v1").unwrap();
        std::fs::write(dir.path().join("b (conflicted).txt"), b"v2").unwrap();
        let pair = matched_pair(&dir, "b.txt", "b (conflicted).txt");
        let mut record = record_for(&pair);

        // View (no diff tool wired in) must loop and then honor Skip.
        let engine = engine(
            false,
            true,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new(
                [Decision::View, Decision::View, Decision::Skip],
                false,
            )),
        );
        engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Different)), &mut record)
            .await;

        assert!(dir.path().join("b (conflicted).txt").exists());
        assert_eq!(record.reason, ResolutionReason::Skipped);
    }

    #[tokio::test]
    async fn test_comparison_error_never_deletes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"v1").unwrap();
        std::fs::write(dir.path().join("b (conflicted).txt"), b"v2").unwrap();
        let pair = matched_pair(&dir, "b.txt", "b (conflicted).txt");
        let mut record = record_for(&pair);

        let engine = engine(
            true,
            true,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::new([Decision::KeepOriginal], true)),
        );
        let outcome = engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Error)), &mut record)
            .await;

        assert!(dir.path().join("b (conflicted).txt").exists());
        assert_eq!(record.reason, ResolutionReason::CompareError);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_failed_delete_marks_record_for_retry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        // Conflicted file intentionally missing so deletion fails.
        let pair = MatchedPair::new(
            ConflictCandidate::new(dir.path().join("a [conflicted].txt"), 2, None),
            Some(dir.path().join("a.txt")),
        );
        let mut record = record_for(&pair);

        let engine = engine(
            true,
            false,
            false,
            Arc::new(LocalFileMutator::new()),
            Arc::new(ScriptedDecisionSource::skip_all()),
        );
        let outcome = engine
            .resolve_pair(&pair, Some(&comparison(CompareVerdict::Identical)), &mut record)
            .await;

        assert_eq!(record.reason, ResolutionReason::DeleteFailed);
        assert!(record.is_active());
        assert!(outcome.error.is_some());
    }
}
