//! Run orchestration - one full discovery/compare/resolve pass
//!
//! `DeconflictUseCase` wires the scanner, matcher, comparator, ledger and
//! resolution engine into the single pass a CLI invocation performs:
//!
//! load ledger -> scan roots -> pair candidates -> compare (bounded
//! parallel) -> resolve sequentially -> reconcile ledger -> persist
//!
//! Comparison fans out across a semaphore-bounded task set; everything
//! that touches the ledger stays on the sequential path, so persisted
//! output is deterministic.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use deconflict_core::config::RunConfig;
use deconflict_core::domain::{CompareVerdict, Comparison, MatchedPair};
use deconflict_core::ports::{IDecisionSource, IFileMutator, IProgressReporter};

use crate::comparator::Comparator;
use crate::diff::DiffViewer;
use crate::error::EngineError;
use crate::ledger::{key_for, ConflictLedger};
use crate::matcher::Matcher;
use crate::mounts::{MountTable, TraversalPolicy};
use crate::resolver::ResolutionEngine;
use crate::scanner::Scanner;

/// How one pair ended up, for per-pair display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairClass {
    Identical,
    Different,
    Orphaned,
    Error,
}

/// Per-pair entry in the run report
#[derive(Debug, Clone)]
pub struct PairReport {
    pub original: Option<PathBuf>,
    pub conflicted: PathBuf,
    pub class: PairClass,
    pub reason: String,
    pub size_original: u64,
    pub size_conflicted: u64,
    /// Deleted this run, or would be under dry-run
    pub deleted: bool,
}

/// Summary of a completed run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Conflicted pairs discovered (matched and orphaned)
    pub pairs_found: usize,
    pub identical: usize,
    pub different: usize,
    pub orphaned: usize,
    pub compare_errors: usize,
    /// Conflicted files deleted (or previewed for deletion under dry-run)
    pub deleted: Vec<PathBuf>,
    /// Per-pair failures (failed deletes, failed comparisons)
    pub pair_errors: Vec<String>,
    /// Paths skipped during scanning with the reason
    pub skipped_paths: Vec<(PathBuf, String)>,
    /// Per-pair detail in discovery order
    pub pairs: Vec<PairReport>,
    pub active_conflicts: usize,
    pub resolved_conflicts: usize,
    pub dry_run: bool,
}

/// Orchestrates one deconflict invocation
pub struct DeconflictUseCase {
    config: RunConfig,
    decisions: Arc<dyn IDecisionSource>,
    mutator: Arc<dyn IFileMutator>,
    reporter: Arc<dyn IProgressReporter>,
    diff: Option<DiffViewer>,
}

impl DeconflictUseCase {
    pub fn new(
        config: RunConfig,
        decisions: Arc<dyn IDecisionSource>,
        mutator: Arc<dyn IFileMutator>,
        reporter: Arc<dyn IProgressReporter>,
        diff: Option<DiffViewer>,
    ) -> Self {
        Self {
            config,
            decisions,
            mutator,
            reporter,
            diff,
        }
    }

    /// Runs the full pass and returns the report
    ///
    /// Only setup problems (no valid roots, unwritable ledger location)
    /// and a failed final persist return `Err`; everything else is
    /// accumulated into the report.
    pub async fn run(&self) -> Result<RunReport, EngineError> {
        let roots = self.validate_roots().await?;
        self.validate_ledger_location().await?;

        let now = Utc::now();
        let mut ledger =
            ConflictLedger::load(&self.config.ledger_path, now, self.reporter.as_ref()).await;

        let mounts = if self.config.cross_device {
            MountTable::empty()
        } else {
            MountTable::detect()
        };

        let mut report = RunReport {
            dry_run: self.config.dry_run,
            ..RunReport::default()
        };

        // Scan roots in order; candidates keep discovery order so the
        // resolution pass and the report stay reproducible.
        let mut candidates = Vec::new();
        for root in &roots {
            let scanner = Scanner::new(
                TraversalPolicy::new(
                    mounts.clone(),
                    self.config.cross_device,
                    self.config.include_local_mounts,
                    root,
                ),
                self.config.recursive,
            );
            let reporter = Arc::clone(&self.reporter);
            let root = root.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                scanner.scan(&root, reporter.as_ref())
            })
            .await
            .map_err(|e| EngineError::TaskFailed(e.to_string()))?;

            report.skipped_paths.extend(outcome.skipped);
            candidates.extend(outcome.candidates);
        }
        info!(candidates = candidates.len(), "scan finished");

        let mut pairs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            pairs.push(Matcher::pair(candidate).await);
        }
        report.pairs_found = pairs.len();

        let comparisons = self.compare_all(&pairs).await?;

        let engine = ResolutionEngine::new(
            self.config.auto_delete,
            self.config.resolve,
            self.config.dry_run,
            Arc::clone(&self.mutator),
            Arc::clone(&self.decisions),
            Arc::clone(&self.reporter),
            self.diff.clone(),
        );

        let mut seen = BTreeSet::new();
        for (pair, comparison) in pairs.iter().zip(comparisons.iter()) {
            let key = key_for(pair);
            seen.insert(key);

            let record = ledger.record_pair(pair, comparison.as_ref(), now);
            let outcome = engine.resolve_pair(pair, comparison.as_ref(), record).await;

            let class = classify(pair, comparison.as_ref());
            match class {
                PairClass::Identical => report.identical += 1,
                PairClass::Different => report.different += 1,
                PairClass::Orphaned => report.orphaned += 1,
                PairClass::Error => report.compare_errors += 1,
            }
            if let Some(deleted) = &outcome.deleted {
                report.deleted.push(deleted.clone());
            }
            if let Some(error) = outcome.error {
                report.pair_errors.push(error);
            }
            report.pairs.push(PairReport {
                original: pair.original.clone(),
                conflicted: pair.conflicted_path().to_path_buf(),
                class,
                reason: comparison
                    .as_ref()
                    .map(|c| c.reason.clone())
                    .unwrap_or_else(|| "no original on disk".to_string()),
                size_original: comparison.as_ref().map(|c| c.size_original).unwrap_or(0),
                size_conflicted: comparison
                    .as_ref()
                    .map(|c| c.size_conflicted)
                    .unwrap_or(pair.candidate.size),
                deleted: outcome.deleted.is_some(),
            });
        }

        ledger.sweep_missing(&seen, now).await;

        if self.config.dry_run {
            debug!("dry-run: ledger left untouched on disk");
        } else {
            ledger.persist(&self.config.ledger_path, now).await?;
        }

        report.active_conflicts = ledger.active_count();
        report.resolved_conflicts = ledger.resolved_count();
        Ok(report)
    }

    /// Keeps the roots that exist and are directories; fatal when none do
    async fn validate_roots(&self) -> Result<Vec<PathBuf>, EngineError> {
        let mut valid = Vec::new();
        for root in &self.config.roots {
            match tokio::fs::metadata(root).await {
                Ok(meta) if meta.is_dir() => valid.push(root.clone()),
                Ok(_) => warn!(root = %root.display(), "root is not a directory; ignoring"),
                Err(e) => warn!(root = %root.display(), error = %e, "root unreadable; ignoring"),
            }
        }
        if valid.is_empty() {
            return Err(EngineError::NoValidRoots(self.config.roots.clone()));
        }
        Ok(valid)
    }

    /// Fails fast when the ledger could never be written at the end
    async fn validate_ledger_location(&self) -> Result<(), EngineError> {
        let parent = match self.config.ledger_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match tokio::fs::metadata(&parent).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(EngineError::LedgerDirUnwritable {
                path: self.config.ledger_path.clone(),
            }),
        }
    }

    /// Compares all matched pairs with bounded parallelism
    ///
    /// Results come back indexed so the sequential resolution pass sees
    /// them in discovery order regardless of completion order.
    async fn compare_all(
        &self,
        pairs: &[MatchedPair],
    ) -> Result<Vec<Option<Comparison>>, EngineError> {
        let comparator = Comparator::new(self.config.method);
        let semaphore = Arc::new(Semaphore::new(self.config.compare_jobs.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, pair) in pairs.iter().enumerate() {
            let Some(original) = pair.original.clone() else {
                continue;
            };
            let conflicted = pair.conflicted_path().to_path_buf();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, comparator.compare(&original, &conflicted).await)
            });
        }

        let mut comparisons: Vec<Option<Comparison>> = pairs.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (idx, comparison) =
                joined.map_err(|e| EngineError::TaskFailed(e.to_string()))?;
            comparisons[idx] = Some(comparison);
        }
        Ok(comparisons)
    }
}

fn classify(pair: &MatchedPair, comparison: Option<&Comparison>) -> PairClass {
    if pair.is_orphaned() {
        return PairClass::Orphaned;
    }
    match comparison.map(|c| c.verdict) {
        Some(CompareVerdict::Identical) => PairClass::Identical,
        Some(CompareVerdict::Different) => PairClass::Different,
        _ => PairClass::Error,
    }
}
