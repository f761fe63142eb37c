//! Persisted conflict records
//!
//! A `ConflictRecord` is the durable unit of the conflict ledger, keyed by
//! the (original, conflicted) path pair. The key is immutable for the life
//! of a record; only status, reason, timestamps, existence and the refreshed
//! size/hash metadata mutate across runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStatus {
    /// The pair is still on disk and unresolved
    Active,
    /// The conflict was resolved (or its conflicted file disappeared)
    Resolved,
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictStatus::Active => "active",
            ConflictStatus::Resolved => "resolved",
        };
        write!(f, "{s}")
    }
}

/// Why a record is in its current status
///
/// The `compare-error` and `delete-failed` variants mark pairs whose
/// handling failed mid-run; such records stay active so the next run
/// retries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionReason {
    /// Content-identical duplicate removed automatically
    IdenticalAutoDeleted,
    /// Operator kept the original; conflicted file removed
    ResolvedKeptOriginal,
    /// Operator kept the conflicted content; original replaced
    ResolvedKeptConflicted,
    /// Operator declined to act on this pair
    Skipped,
    /// Real conflict awaiting a resolution decision
    PendingReview,
    /// Conflicted file with no original on disk
    Orphaned,
    /// The pair could not be compared
    CompareError,
    /// A delete or replace operation failed
    DeleteFailed,
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionReason::IdenticalAutoDeleted => "identical-auto-deleted",
            ResolutionReason::ResolvedKeptOriginal => "resolved-kept-original",
            ResolutionReason::ResolvedKeptConflicted => "resolved-kept-conflicted",
            ResolutionReason::Skipped => "skipped",
            ResolutionReason::PendingReview => "pending-review",
            ResolutionReason::Orphaned => "orphaned",
            ResolutionReason::CompareError => "compare-error",
            ResolutionReason::DeleteFailed => "delete-failed",
        };
        write!(f, "{s}")
    }
}

/// Identity of a record: the normalized path pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub original: String,
    pub conflicted: String,
}

impl RecordKey {
    pub fn new(original: impl Into<String>, conflicted: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            conflicted: conflicted.into(),
        }
    }
}

/// One durable ledger entry
///
/// Field names form the on-disk JSON schema and must stay stable across
/// versions. Fields this version does not know are captured in `extra` and
/// written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub original_path: String,
    pub conflicted_path: String,
    pub size_original: u64,
    pub size_conflicted: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_conflicted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_original: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_conflicted: Option<DateTime<Utc>>,
    pub status: ConflictStatus,
    pub reason: ResolutionReason,
    pub still_exists: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConflictRecord {
    /// Creates a fresh active record for a newly discovered pair
    pub fn new(
        original_path: impl Into<String>,
        conflicted_path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            conflicted_path: conflicted_path.into(),
            size_original: 0,
            size_conflicted: 0,
            hash_original: None,
            hash_conflicted: None,
            modified_original: None,
            modified_conflicted: None,
            status: ConflictStatus::Active,
            reason: ResolutionReason::PendingReview,
            still_exists: true,
            first_seen: now,
            last_seen: now,
            extra: serde_json::Map::new(),
        }
    }

    /// Returns the record's immutable identity
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.original_path.clone(), self.conflicted_path.clone())
    }

    /// Marks the record terminally resolved
    ///
    /// A resolved record describes a conflict whose conflicted file is no
    /// longer on disk, so `still_exists` drops with it.
    pub fn mark_resolved(&mut self, reason: ResolutionReason) {
        self.status = ConflictStatus::Resolved;
        self.reason = reason;
        self.still_exists = false;
    }

    /// Records a non-terminal outcome; the pair remains on disk
    pub fn mark_active(&mut self, reason: ResolutionReason) {
        self.status = ConflictStatus::Active;
        self.reason = reason;
        self.still_exists = true;
    }

    /// Returns true if the record is still awaiting a resolution
    pub fn is_active(&self) -> bool {
        self.status == ConflictStatus::Active
    }
}
