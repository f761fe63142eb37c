//! Console progress reporter
//!
//! Backs the progress port with an indicatif spinner during scanning and
//! plain prints for notices. The spinner is cleared as soon as a scan
//! finishes so later interactive prompts get a clean terminal.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use deconflict_core::ports::IProgressReporter;

/// Reporter printing to the operator's terminal
pub struct ConsoleReporter {
    show_progress: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    /// Creates a reporter; `show_progress` controls the spinner only,
    /// notices always print
    pub fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            spinner: Mutex::new(None),
        }
    }

    /// Clears any live spinner (idempotent)
    pub fn finish(&self) {
        if let Some(spinner) = self.spinner.lock().expect("spinner lock poisoned").take() {
            spinner.finish_and_clear();
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        if !self.show_progress {
            return;
        }
        let mut guard = self.spinner.lock().expect("spinner lock poisoned");
        let spinner = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        f(spinner);
    }

    /// Prints above the spinner when one is live, plainly otherwise
    fn println(&self, message: &str) {
        let guard = self.spinner.lock().expect("spinner lock poisoned");
        match guard.as_ref() {
            Some(spinner) => spinner.println(message),
            None => println!("{message}"),
        }
    }
}

impl IProgressReporter for ConsoleReporter {
    fn scanning(&self, dir: &Path) {
        self.with_spinner(|spinner| {
            spinner.set_message(format!("Scanning: {}", dir.display()));
        });
    }

    fn skipped_path(&self, path: &Path, why: &str) {
        self.println(&format!("Skipped {}: {why}", path.display()));
    }

    fn note(&self, message: &str) {
        self.println(message);
    }

    fn pending_deletion(&self, original: &Path, conflicted: &Path) {
        self.println(&format!(
            "  The two files\n      {}\n      {}\n    are identical, would delete\n      {}",
            original.display(),
            conflicted.display(),
            conflicted.display()
        ));
    }

    fn scan_complete(&self, _dirs: u64, _files: u64) {
        self.finish();
    }
}
