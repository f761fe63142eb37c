//! Human-readable run output
//!
//! Per-pair result lines plus the end-of-run summary block, shaped after
//! the counts the engine accumulates. Everything here is display-only.

use deconflict_core::config::RunConfig;
use deconflict_engine::use_cases::{PairClass, PairReport};
use deconflict_engine::RunReport;

/// Prints per-pair lines and the summary block
pub fn print_report(report: &RunReport, config: &RunConfig) {
    if report.pairs_found == 0 {
        println!("No conflicted file pairs found.");
        return;
    }

    println!(
        "Found {} conflicted file pair(s)\n",
        report.pairs_found
    );

    for pair in &report.pairs {
        print_pair(pair, config);
    }

    if !report.skipped_paths.is_empty() {
        println!(
            "\nSkipped {} path(s) due to errors during scanning",
            report.skipped_paths.len()
        );
        for (path, why) in report.skipped_paths.iter().take(5) {
            println!("  - {}: {why}", path.display());
        }
        if report.skipped_paths.len() > 5 {
            println!("  (showing first 5 of {})", report.skipped_paths.len());
        }
    }

    for error in &report.pair_errors {
        eprintln!("Error: {error}");
    }

    if !report.dry_run {
        println!(
            "\nConflict tracking updated in: {}",
            config.ledger_path.display()
        );
        println!("  Active conflicts: {}", report.active_conflicts);
        if report.resolved_conflicts > 0 {
            println!("  Resolved conflicts: {}", report.resolved_conflicts);
        }
    }

    println!("\n{}", "=".repeat(50));
    println!("SUMMARY:");
    println!("Total conflicted pairs found: {}", report.pairs_found);
    println!("Identical files: {}", report.identical);
    println!("Different files: {}", report.different);
    if report.orphaned > 0 {
        println!("Orphaned conflicts: {}", report.orphaned);
    }
    if report.compare_errors > 0 {
        println!("Comparison errors: {}", report.compare_errors);
    }

    if !report.deleted.is_empty() {
        println!(
            "\n{} {} identical conflicted file(s)",
            if report.dry_run {
                "Would delete"
            } else {
                "Deleted"
            },
            report.deleted.len()
        );
    }

    if report.identical > report.deleted.len() && !config.auto_delete && !report.dry_run {
        println!("\nTip: Use --auto-delete to automatically delete identical conflicted files");
    }

    if report.active_conflicts > 0 && !report.dry_run {
        println!(
            "\nFiles requiring manual review are tracked in: {}",
            config.ledger_path.display()
        );
        println!("The file contains all active conflicts from this and previous runs.");
        println!("Resolved conflicts are marked but kept for history.");
    }
}

fn print_pair(pair: &PairReport, config: &RunConfig) {
    let name = pair
        .conflicted
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pair.conflicted.display().to_string());

    match pair.class {
        PairClass::Identical => {
            if !(config.show_identical || config.verbose) {
                return;
            }
            println!("\u{2713} IDENTICAL: {name}");
        }
        PairClass::Different => println!("\u{2717} DIFFERENT: {name}"),
        PairClass::Orphaned => println!("? ORPHANED: {name} (no original on disk)"),
        PairClass::Error => println!("! ERROR: {name} ({})", pair.reason),
    }

    if config.verbose {
        if let Some(original) = &pair.original {
            println!(
                "  Original:    {} ({})",
                original.display(),
                format_bytes(pair.size_original)
            );
        }
        println!(
            "  Conflicted:  {} ({})",
            pair.conflicted.display(),
            format_bytes(pair.size_conflicted)
        );
        println!("  Reason:      {}", pair.reason);
        if pair.deleted {
            println!("  Deleted this run");
        }
        println!();
    }
}

/// Format a byte count into a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_small() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn test_format_bytes_kib() {
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
    }

    #[test]
    fn test_format_bytes_mib() {
        assert_eq!(format_bytes(1048576), "1.0 MiB");
    }

    #[test]
    fn test_format_bytes_gib() {
        assert_eq!(format_bytes(1073741824), "1.0 GiB");
    }
}
