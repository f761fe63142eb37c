//! The persistent conflict ledger
//!
//! An explicit value loaded at run start, reconciled in memory, and written
//! back once at the end of a non-dry-run. Records are keyed by the
//! (original, conflicted) path pair and kept in a `BTreeMap` so persisted
//! output is deterministically ordered. Persistence is atomic: serialize to
//! a temporary file in the destination directory, then rename over the
//! target, so a crash never leaves a truncated ledger.
//!
//! A corrupt ledger never aborts a run: the unreadable file is backed up
//! beside itself and the run starts from an empty ledger.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use deconflict_core::domain::{
    Comparison, ConflictRecord, ConflictStatus, MatchedPair, RecordKey,
};
use deconflict_core::ports::IProgressReporter;

use crate::error::EngineError;
use crate::matcher::strip_conflict_marker;

/// On-disk shape of the ledger file
///
/// `files` is accepted as a legacy alias for `conflicts`. Top-level fields
/// this version does not know are preserved through `extra`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    total_active_conflicts: u64,
    #[serde(default)]
    total_resolved_conflicts: u64,
    #[serde(default, alias = "files")]
    conflicts: Vec<ConflictRecord>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Ordered record store tracking conflicts across runs
#[derive(Debug, Default)]
pub struct ConflictLedger {
    records: BTreeMap<RecordKey, ConflictRecord>,
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ConflictLedger {
    /// An empty ledger
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the ledger from `path`
    ///
    /// A missing file yields an empty ledger. An unparsable file is backed
    /// up beside itself (`<name>.corrupt-<timestamp>`), announced through
    /// the reporter, and the run continues with an empty ledger.
    pub async fn load(path: &Path, now: DateTime<Utc>, reporter: &dyn IProgressReporter) -> Self {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger on disk; starting empty");
                return Self::empty();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read ledger; starting empty");
                reporter.note(&format!(
                    "Warning: could not read conflict ledger {}: {e}",
                    path.display()
                ));
                return Self::empty();
            }
        };

        let parsed: LedgerFile = match serde_json::from_slice(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                let backup = backup_path(path, now);
                match tokio::fs::rename(path, &backup).await {
                    Ok(()) => {
                        warn!(
                            path = %path.display(),
                            backup = %backup.display(),
                            error = %e,
                            "ledger unparsable; backed up and starting empty"
                        );
                        reporter.note(&format!(
                            "Warning: conflict ledger {} is unreadable ({e}); backed up to {}",
                            path.display(),
                            backup.display()
                        ));
                    }
                    Err(rename_err) => {
                        warn!(
                            path = %path.display(),
                            error = %rename_err,
                            "could not back up corrupt ledger"
                        );
                        reporter.note(&format!(
                            "Warning: conflict ledger {} is unreadable ({e}) and could not be backed up",
                            path.display()
                        ));
                    }
                }
                return Self::empty();
            }
        };

        let mut records = BTreeMap::new();
        for record in parsed.conflicts {
            records.insert(record.key(), record);
        }
        info!(count = records.len(), path = %path.display(), "ledger loaded");
        Self {
            records,
            extra: parsed.extra,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records still awaiting resolution
    pub fn active_count(&self) -> usize {
        self.records.values().filter(|r| r.is_active()).count()
    }

    /// Records resolved this run or historically
    pub fn resolved_count(&self) -> usize {
        self.records.len() - self.active_count()
    }

    /// Iterates records in key order
    pub fn records(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.records.values()
    }

    /// Looks up a record by key
    pub fn get(&self, key: &RecordKey) -> Option<&ConflictRecord> {
        self.records.get(key)
    }

    /// Finds or creates the record for a discovered pair and refreshes its
    /// observation metadata
    ///
    /// New records start active with reason `pending-review`; the
    /// resolution engine overwrites the reason with the run's outcome.
    /// Digests are only overwritten when the comparison produced them, so
    /// a byte-mode run does not erase drift-detection state.
    pub fn record_pair(
        &mut self,
        pair: &MatchedPair,
        comparison: Option<&Comparison>,
        now: DateTime<Utc>,
    ) -> &mut ConflictRecord {
        let key = key_for(pair);
        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| ConflictRecord::new(key.original, key.conflicted, now));

        record.still_exists = true;
        record.status = ConflictStatus::Active;
        record.last_seen = now;

        match comparison {
            Some(cmp) => {
                record.size_original = cmp.size_original;
                record.size_conflicted = cmp.size_conflicted;
                record.modified_original = cmp.modified_original;
                record.modified_conflicted = cmp.modified_conflicted;
                if cmp.hash_original.is_some() {
                    record.hash_original = cmp.hash_original.clone();
                }
                if cmp.hash_conflicted.is_some() {
                    record.hash_conflicted = cmp.hash_conflicted.clone();
                }
            }
            None => {
                // Orphaned pair: only the conflicted side exists.
                record.size_original = 0;
                record.size_conflicted = pair.candidate.size;
                record.modified_conflicted = pair.candidate.modified;
            }
        }

        record
    }

    /// Survival check for records the scan did not rediscover
    ///
    /// A record whose conflicted file disappeared is closed out as
    /// resolved with its historical reason untouched; one still on disk
    /// stays active with a refreshed `last_seen`.
    pub async fn sweep_missing(&mut self, seen: &BTreeSet<RecordKey>, now: DateTime<Utc>) {
        for (key, record) in self.records.iter_mut() {
            if seen.contains(key) {
                continue;
            }
            let exists = tokio::fs::try_exists(&record.conflicted_path)
                .await
                .unwrap_or(false);
            if exists {
                record.last_seen = now;
            } else if record.still_exists {
                debug!(
                    conflicted = %record.conflicted_path,
                    "conflicted file gone; closing record"
                );
                record.still_exists = false;
                record.status = ConflictStatus::Resolved;
            }
        }
    }

    /// Atomically writes the ledger to `path`
    pub async fn persist(&self, path: &Path, now: DateTime<Utc>) -> Result<(), EngineError> {
        let file = LedgerFile {
            last_updated: Some(now),
            total_active_conflicts: self.active_count() as u64,
            total_resolved_conflicts: self.resolved_count() as u64,
            conflicts: self.records.values().cloned().collect(),
            extra: self.extra.clone(),
        };

        let json = serde_json::to_vec_pretty(&file).map_err(|e| EngineError::PersistFailed {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        // Write beside the destination, then rename: same filesystem, so
        // the rename is atomic and a crash cannot truncate the ledger.
        let tmp = {
            let mut p = path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| EngineError::PersistFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| EngineError::PersistFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        info!(path = %path.display(), records = self.records.len(), "ledger persisted");
        Ok(())
    }
}

/// Ledger key for a pair; orphans key on the derived original path
pub fn key_for(pair: &MatchedPair) -> RecordKey {
    let original = match &pair.original {
        Some(p) => p.display().to_string(),
        None => {
            let name = strip_conflict_marker(pair.candidate.file_name())
                .unwrap_or_else(|| pair.candidate.file_name().to_string());
            pair.candidate.directory.join(name).display().to_string()
        }
    };
    RecordKey::new(original, pair.candidate.path.display().to_string())
}

fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(format!(".corrupt-{}", now.format("%Y%m%d%H%M%S")));
    PathBuf::from(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconflict_core::domain::{CompareMethod, CompareVerdict, ConflictCandidate};
    use deconflict_core::ports::NullReporter;
    use tempfile::TempDir;

    fn pair_in(dir: &Path, base: &str, marker: &str, orphan: bool) -> MatchedPair {
        let conflicted = dir.join(format!("{base}{marker}.txt"));
        let candidate = ConflictCandidate::new(conflicted, 4, None);
        let original = (!orphan).then(|| dir.join(format!("{base}.txt")));
        MatchedPair::new(candidate, original)
    }

    fn comparison(identical: bool) -> Comparison {
        Comparison {
            verdict: if identical {
                CompareVerdict::Identical
            } else {
                CompareVerdict::Different
            },
            method: CompareMethod::Hash,
            reason: String::new(),
            size_original: 4,
            size_conflicted: 4,
            modified_original: None,
            modified_conflicted: None,
            hash_original: Some("aa".repeat(32)),
            hash_conflicted: Some("aa".repeat(32)),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ConflictLedger::load(
            &dir.path().join("nothing.json"),
            Utc::now(),
            &NullReporter,
        )
        .await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_backs_up_and_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let ledger = ConflictLedger::load(&path, Utc::now(), &NullReporter).await;
        assert!(ledger.is_empty());
        assert!(!path.exists());

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[tokio::test]
    async fn test_record_pair_creates_then_refreshes() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ConflictLedger::empty();
        let pair = pair_in(dir.path(), "a", " [conflicted]", false);
        let cmp = comparison(false);

        let first_seen = Utc::now();
        ledger.record_pair(&pair, Some(&cmp), first_seen);
        assert_eq!(ledger.len(), 1);

        let later = first_seen + chrono::Duration::seconds(60);
        let record = ledger.record_pair(&pair, Some(&cmp), later);
        assert_eq!(record.first_seen, first_seen);
        assert_eq!(record.last_seen, later);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_byte_run_keeps_previous_digests() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ConflictLedger::empty();
        let pair = pair_in(dir.path(), "a", " [conflicted]", false);
        let now = Utc::now();

        ledger.record_pair(&pair, Some(&comparison(false)), now);

        let mut byte_cmp = comparison(false);
        byte_cmp.method = CompareMethod::Byte;
        byte_cmp.hash_original = None;
        byte_cmp.hash_conflicted = None;
        let record = ledger.record_pair(&pair, Some(&byte_cmp), now);
        assert!(record.hash_original.is_some());
    }

    #[tokio::test]
    async fn test_orphan_records_conflicted_size_only() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ConflictLedger::empty();
        let pair = pair_in(dir.path(), "lone", " (conflicted)", true);

        let record = ledger.record_pair(&pair, None, Utc::now());
        assert_eq!(record.size_conflicted, 4);
        assert_eq!(record.size_original, 0);
        assert!(record.original_path.ends_with("lone.txt"));
    }

    #[tokio::test]
    async fn test_sweep_closes_records_for_vanished_files() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ConflictLedger::empty();

        // On disk: stays active. Not on disk: closed as resolved.
        let kept = dir.path().join("kept [conflicted].txt");
        std::fs::write(&kept, b"x").unwrap();
        std::fs::write(dir.path().join("kept.txt"), b"x").unwrap();

        let now = Utc::now();
        let pair_kept = pair_in(dir.path(), "kept", " [conflicted]", false);
        let pair_gone = pair_in(dir.path(), "gone", " [conflicted]", false);
        ledger.record_pair(&pair_kept, Some(&comparison(false)), now);
        ledger.record_pair(&pair_gone, Some(&comparison(false)), now);

        let later = now + chrono::Duration::seconds(5);
        ledger.sweep_missing(&BTreeSet::new(), later).await;

        let kept_record = ledger.get(&key_for(&pair_kept)).unwrap();
        assert!(kept_record.still_exists);
        assert!(kept_record.is_active());
        assert_eq!(kept_record.last_seen, later);

        let gone_record = ledger.get(&key_for(&pair_gone)).unwrap();
        assert!(!gone_record.still_exists);
        assert_eq!(gone_record.status, ConflictStatus::Resolved);
    }

    #[tokio::test]
    async fn test_persist_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = ConflictLedger::empty();
        let now = Utc::now();
        let pair = pair_in(dir.path(), "a", " [conflicted]", false);
        ledger.record_pair(&pair, Some(&comparison(false)), now);

        ledger.persist(&path, now).await.unwrap();

        let loaded = ConflictLedger::load(&path, now, &NullReporter).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(&key_for(&pair)).unwrap(),
            ledger.get(&key_for(&pair)).unwrap()
        );
    }

    #[tokio::test]
    async fn test_persist_is_deterministic_for_fixed_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = ConflictLedger::empty();
        let now = Utc::now();
        // Insert out of key order; output must not depend on insert order.
        ledger.record_pair(
            &pair_in(dir.path(), "zz", " [conflicted]", false),
            Some(&comparison(false)),
            now,
        );
        ledger.record_pair(
            &pair_in(dir.path(), "aa", " [conflicted]", false),
            Some(&comparison(false)),
            now,
        );

        ledger.persist(&path, now).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        ledger.persist(&path, now).await.unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        let aa = text.find("aa [conflicted].txt").unwrap();
        let zz = text.find("zz [conflicted].txt").unwrap();
        assert!(aa < zz);
    }

    #[tokio::test]
    async fn test_legacy_files_key_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let now = Utc::now();
        let record = ConflictRecord::new("/d/a.txt", "/d/a [conflicted].txt", now);
        let legacy = serde_json::json!({ "files": [record] });
        std::fs::write(&path, serde_json::to_vec(&legacy).unwrap()).unwrap();

        let ledger = ConflictLedger::load(&path, now, &NullReporter).await;
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_top_level_fields_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let now = Utc::now();
        std::fs::write(
            &path,
            serde_json::to_vec(&serde_json::json!({
                "conflicts": [],
                "schema_note": "kept across rewrites"
            }))
            .unwrap(),
        )
        .unwrap();

        let ledger = ConflictLedger::load(&path, now, &NullReporter).await;
        ledger.persist(&path, now).await.unwrap();

        let reread: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(reread["schema_note"], "kept across rewrites");
    }
}
