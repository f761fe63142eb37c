//! Decision source port (driving/primary port)
//!
//! The resolution engine never assumes a terminal exists. Whenever a pair
//! needs an operator choice, it asks an `IDecisionSource`: the CLI provides
//! an interactive prompt implementation, tests provide scripted ones. This
//! keeps the engine's state machine deterministic and testable.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// The operator's choice for a content-differing pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the original; delete the conflicted file
    KeepOriginal,
    /// Replace the original's content with the conflicted file's, then
    /// delete the conflicted file
    KeepConflicted,
    /// Leave both files in place for now
    Skip,
    /// Show a diff, then ask again
    View,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::KeepOriginal => "keep-original",
            Decision::KeepConflicted => "keep-conflicted",
            Decision::Skip => "skip",
            Decision::View => "view",
        };
        write!(f, "{s}")
    }
}

/// Metadata handed to a decision source when asking about a pair
#[derive(Debug, Clone)]
pub struct PairSummary {
    pub original: PathBuf,
    pub conflicted: PathBuf,
    pub size_original: u64,
    pub size_conflicted: u64,
    pub modified_original: Option<DateTime<Utc>>,
    pub modified_conflicted: Option<DateTime<Utc>>,
    /// Why the pair was classified different
    pub reason: String,
}

/// Port trait for obtaining resolution decisions
#[async_trait::async_trait]
pub trait IDecisionSource: Send + Sync {
    /// Asks what to do with a content-differing pair
    async fn decide(&self, pair: &PairSummary) -> anyhow::Result<Decision>;

    /// Asks for confirmation before deleting an identical conflicted file
    async fn confirm_delete(&self, path: &Path) -> anyhow::Result<bool>;
}

/// Scripted decision source for tests and non-interactive callers
///
/// Pops decisions from a queue in order; once the queue is exhausted every
/// further question is answered `Skip` / "no", so a short script can never
/// cause a mutation it did not spell out.
pub struct ScriptedDecisionSource {
    decisions: Mutex<VecDeque<Decision>>,
    confirm: bool,
}

impl ScriptedDecisionSource {
    /// Creates a source that replays `decisions` and answers deletion
    /// confirmations with `confirm`
    pub fn new(decisions: impl IntoIterator<Item = Decision>, confirm: bool) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            confirm,
        }
    }

    /// Creates a source that skips everything
    pub fn skip_all() -> Self {
        Self::new([], false)
    }
}

#[async_trait::async_trait]
impl IDecisionSource for ScriptedDecisionSource {
    async fn decide(&self, _pair: &PairSummary) -> anyhow::Result<Decision> {
        let mut queue = self
            .decisions
            .lock()
            .expect("decision queue lock poisoned");
        Ok(queue.pop_front().unwrap_or(Decision::Skip))
    }

    async fn confirm_delete(&self, _path: &Path) -> anyhow::Result<bool> {
        Ok(self.confirm)
    }
}
