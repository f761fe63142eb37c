//! Filesystem traversal
//!
//! Walks the given root applying the mount boundary policy and yields the
//! conflicted-file candidates it finds. The scan is restartable (no
//! cross-call state) and never fatal: unreadable entries are recorded as
//! skips and the walk continues.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use deconflict_core::domain::ConflictCandidate;
use deconflict_core::ports::IProgressReporter;

use crate::matcher::is_conflicted_name;
use crate::mounts::{Descend, TraversalPolicy};

/// Everything one scan of one root produced
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Conflicted files found, in traversal order
    pub candidates: Vec<ConflictCandidate>,
    /// Directories entered
    pub dirs_visited: u64,
    /// Files looked at
    pub files_seen: u64,
    /// Paths skipped with a non-fatal error and why
    pub skipped: Vec<(PathBuf, String)>,
}

/// Walks a root for conflicted-file candidates
pub struct Scanner {
    policy: TraversalPolicy,
    recursive: bool,
}

impl Scanner {
    /// Creates a scanner with the given boundary policy
    pub fn new(policy: TraversalPolicy, recursive: bool) -> Self {
        Self { policy, recursive }
    }

    /// Walks `root` and collects candidates
    ///
    /// Non-recursive mode restricts the walk to the root's direct
    /// children. Directories the policy excludes are announced through the
    /// reporter and pruned before entry.
    pub fn scan(&self, root: &Path, reporter: &dyn IProgressReporter) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let mut walker = WalkDir::new(root).follow_links(false);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let policy = &self.policy;
        let iter = walker.into_iter().filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match policy.should_descend(entry.path()) {
                Descend::Yes => true,
                Descend::CloudMount => {
                    reporter.note(&format!(
                        "Skipping cloud storage: {}",
                        entry.path().display()
                    ));
                    false
                }
                Descend::ForeignDevice => {
                    reporter.note(&format!("Skipping mount point: {}", entry.path().display()));
                    false
                }
            }
        });

        for result in iter {
            match result {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        outcome.dirs_visited += 1;
                        reporter.scanning(entry.path());
                    } else if entry.file_type().is_file() {
                        outcome.files_seen += 1;
                        let name = entry.file_name().to_string_lossy();
                        if !is_conflicted_name(&name) {
                            continue;
                        }
                        match entry.metadata() {
                            Ok(meta) => {
                                let modified = meta.modified().ok().and_then(to_utc);
                                debug!(path = %entry.path().display(), "conflicted candidate found");
                                outcome.candidates.push(ConflictCandidate::new(
                                    entry.into_path(),
                                    meta.len(),
                                    modified,
                                ));
                            }
                            Err(e) => {
                                let why = e.to_string();
                                let path = entry.into_path();
                                reporter.skipped_path(&path, &why);
                                outcome.skipped.push((path, why));
                            }
                        }
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    let why = e.to_string();
                    warn!(path = %path.display(), error = %why, "skipping unreadable entry");
                    reporter.skipped_path(&path, &why);
                    outcome.skipped.push((path, why));
                }
            }
        }

        reporter.scan_complete(outcome.dirs_visited, outcome.files_seen);
        outcome
    }
}

fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconflict_core::ports::NullReporter;
    use tempfile::TempDir;

    use crate::mounts::MountTable;

    fn scanner(root: &Path, recursive: bool) -> Scanner {
        let policy = TraversalPolicy::new(MountTable::empty(), false, false, root);
        Scanner::new(policy, recursive)
    }

    #[test]
    fn test_finds_candidates_recursively() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("a [conflicted].txt"), b"hello").unwrap();
        std::fs::write(sub.join("b (conflicted).md"), b"x").unwrap();
        std::fs::write(sub.join("plain.md"), b"y").unwrap();

        let outcome = scanner(dir.path(), true).scan(dir.path(), &NullReporter);

        let mut names: Vec<String> = outcome
            .candidates
            .iter()
            .map(|c| c.file_name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a [conflicted].txt", "b (conflicted).md"]);
        assert_eq!(outcome.files_seen, 4);
        assert!(outcome.dirs_visited >= 2);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_non_recursive_stays_at_top_level() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("top [conflicted].txt"), b"x").unwrap();
        std::fs::write(sub.join("deep [conflicted].txt"), b"x").unwrap();

        let outcome = scanner(dir.path(), false).scan(dir.path(), &NullReporter);

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].file_name(), "top [conflicted].txt");
    }

    #[test]
    fn test_candidate_carries_size_and_mtime() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("c [conflicted].bin"), b"12345").unwrap();

        let outcome = scanner(dir.path(), true).scan(dir.path(), &NullReporter);

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].size, 5);
        assert!(outcome.candidates[0].modified.is_some());
    }

    #[test]
    fn test_rescan_yields_same_candidates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("r [conflicted].txt"), b"x").unwrap();

        let s = scanner(dir.path(), true);
        let first = s.scan(dir.path(), &NullReporter);
        let second = s.scan(dir.path(), &NullReporter);
        assert_eq!(first.candidates, second.candidates);
    }

    #[test]
    fn test_excluded_mount_is_pruned() {
        let dir = TempDir::new().unwrap();
        let cloud = dir.path().join("cloud");
        std::fs::create_dir(&cloud).unwrap();
        std::fs::write(cloud.join("c [conflicted].txt"), b"x").unwrap();
        std::fs::write(dir.path().join("local [conflicted].txt"), b"x").unwrap();

        let policy = TraversalPolicy::new(
            MountTable::with_mounts(vec![cloud.clone()]),
            false,
            false,
            dir.path(),
        );
        let outcome = Scanner::new(policy, true).scan(dir.path(), &NullReporter);

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].file_name(), "local [conflicted].txt");
    }
}
