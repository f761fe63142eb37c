//! Run configuration
//!
//! The flag set one invocation operates under, assembled by the CLI and
//! handed to the engine. Mirrors the command line one-to-one so the engine
//! never parses arguments itself.

use std::path::PathBuf;

use crate::domain::CompareMethod;

/// Default name of the ledger file, created in the working directory
pub const DEFAULT_LEDGER_FILE: &str = "conflicted_files_to_review.json";

/// Default number of comparisons running concurrently
pub const DEFAULT_COMPARE_JOBS: usize = 4;

/// Configuration for a single deconflict run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root directories to scan
    pub roots: Vec<PathBuf>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// How to compare equal-sized pairs
    pub method: CompareMethod,
    /// Delete identical conflicted files without confirmation
    pub auto_delete: bool,
    /// Interactively resolve content-differing pairs
    pub resolve: bool,
    /// Analyze everything, mutate nothing
    pub dry_run: bool,
    /// Cross every mount boundary (network mounts, external drives, ...)
    pub cross_device: bool,
    /// Cross onto other local filesystems while still excluding cloud and
    /// network mounts
    pub include_local_mounts: bool,
    /// Also report pairs that turned out identical
    pub show_identical: bool,
    /// Verbose per-pair output
    pub verbose: bool,
    /// Where the conflict ledger lives
    pub ledger_path: PathBuf,
    /// Upper bound on concurrent content comparisons
    pub compare_jobs: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            recursive: false,
            method: CompareMethod::Hash,
            auto_delete: false,
            resolve: false,
            dry_run: false,
            cross_device: false,
            include_local_mounts: false,
            show_identical: false,
            verbose: false,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            compare_jobs: DEFAULT_COMPARE_JOBS,
        }
    }
}

impl RunConfig {
    /// Creates a config scanning the given roots with default flags
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Sets recursive traversal
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Sets the comparison method
    pub fn with_method(mut self, method: CompareMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets automatic deletion of identical duplicates
    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Sets interactive resolution of differing pairs
    pub fn with_resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    /// Sets dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the ledger location
    pub fn with_ledger_path(mut self, path: PathBuf) -> Self {
        self.ledger_path = path;
        self
    }
}
