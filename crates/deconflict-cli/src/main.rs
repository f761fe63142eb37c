//! DeConflict CLI - find and reconcile conflicted sync duplicates
//!
//! Scans the given directories for files carrying a sync-client conflict
//! marker, compares each against its original, deletes identical
//! duplicates (on request), and tracks real conflicts in a JSON ledger
//! across runs.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod output;
mod progress;
mod prompt;

use deconflict_core::config::{RunConfig, DEFAULT_COMPARE_JOBS, DEFAULT_LEDGER_FILE};
use deconflict_core::domain::CompareMethod;
use deconflict_core::ports::{IFileMutator, IProgressReporter};
use deconflict_engine::diff::DiffViewer;
use deconflict_engine::fs::{DryRunMutator, LocalFileMutator};
use deconflict_engine::DeconflictUseCase;
use output::print_report;
use progress::ConsoleReporter;
use prompt::InteractivePrompt;

#[derive(Debug, Parser)]
#[command(
    name = "deconflict",
    version,
    about = "Find and compare conflicted files left behind by cloud sync services"
)]
pub struct Cli {
    /// Directories to scan
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Scan directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Comparison method: 'hash' (SHA-256) or 'byte' (byte-by-byte)
    #[arg(short, long, default_value = "hash", value_parser = CompareMethod::from_str)]
    method: CompareMethod,

    /// Automatically delete identical conflicted files without confirmation
    #[arg(long)]
    auto_delete: bool,

    /// Interactively resolve pairs whose content differs
    #[arg(long)]
    resolve: bool,

    /// Show what would be deleted without actually deleting
    #[arg(long)]
    dry_run: bool,

    /// Cross device boundaries (network mounts, external drives, ...)
    #[arg(long)]
    cross_device: bool,

    /// Include local physical drives while still excluding cloud/network storage
    #[arg(long)]
    include_local_mounts: bool,

    /// Also show files that are identical
    #[arg(long)]
    show_identical: bool,

    /// Disable the progress indicator during scanning
    #[arg(long)]
    no_progress: bool,

    /// Show detailed output for all files
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output file tracking conflicts across runs
    #[arg(short, long, default_value = DEFAULT_LEDGER_FILE, value_name = "FILE")]
    output: PathBuf,

    /// Upper bound on concurrent file comparisons
    #[arg(long, default_value_t = DEFAULT_COMPARE_JOBS, value_name = "N")]
    jobs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig {
        roots: cli.paths.clone(),
        recursive: cli.recursive,
        method: cli.method,
        auto_delete: cli.auto_delete,
        resolve: cli.resolve,
        dry_run: cli.dry_run,
        cross_device: cli.cross_device,
        include_local_mounts: cli.include_local_mounts,
        show_identical: cli.show_identical,
        verbose: cli.verbose > 0,
        ledger_path: cli.output.clone(),
        compare_jobs: cli.jobs,
    };

    println!(
        "Scanning {} in: {}",
        if config.recursive {
            "recursively"
        } else {
            "non-recursively"
        },
        config
            .roots
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Using comparison method: {}", config.method);
    if !config.auto_delete && !config.dry_run {
        println!("Will ask for confirmation before deleting identical files");
    }
    println!();

    let mutator: Arc<dyn IFileMutator> = if config.dry_run {
        // The engine previews instead of mutating under dry-run; wiring in
        // the recording mutator means even a gating bug cannot touch disk.
        Arc::new(DryRunMutator::new())
    } else {
        Arc::new(LocalFileMutator::new())
    };

    let diff = if config.resolve && !config.dry_run {
        DiffViewer::detect().ok()
    } else {
        None
    };

    let reporter = Arc::new(ConsoleReporter::new(!cli.no_progress));
    let use_case = DeconflictUseCase::new(
        config.clone(),
        Arc::new(InteractivePrompt::new()),
        mutator,
        Arc::clone(&reporter) as Arc<dyn IProgressReporter>,
        diff,
    );

    let report = use_case.run().await.context("deconflict run failed")?;
    reporter.finish();

    print_report(&report, &config);
    Ok(())
}
