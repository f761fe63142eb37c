//! Diff viewer for the `view` decision
//!
//! Detects and launches an external diff tool so the operator can inspect
//! a real conflict before choosing a side. GUI tools are spawned in the
//! background; terminal tools run in the foreground and block until
//! closed.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

/// Supported diff tools in order of preference
const DIFF_TOOLS: &[(&str, &[&str])] = &[
    ("meld", &[]),
    ("kdiff3", &[]),
    ("vimdiff", &[]),
    ("diff", &["--color=auto", "-u"]),
];

/// Errors locating or running a diff tool
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("no diff tool found; install meld, kdiff3 or vimdiff")]
    NoToolAvailable,

    #[error("diff tool '{tool}' failed to launch: {source}")]
    LaunchFailed {
        tool: String,
        source: std::io::Error,
    },
}

/// Launches external diff tools against a conflicted pair
#[derive(Debug, Clone)]
pub struct DiffViewer {
    tool: String,
}

impl DiffViewer {
    /// Detects the best available diff tool on this system
    pub fn detect() -> Result<Self, DiffError> {
        for (tool, _) in DIFF_TOOLS {
            if is_available(tool) {
                debug!(tool, "detected diff tool");
                return Ok(Self {
                    tool: (*tool).to_string(),
                });
            }
        }
        Err(DiffError::NoToolAvailable)
    }

    /// Creates a viewer for a specific tool without probing the system
    pub fn with_tool(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Shows the difference between the original and the conflicted file
    pub fn show(&self, original: &Path, conflicted: &Path) -> Result<(), DiffError> {
        info!(
            tool = %self.tool,
            original = %original.display(),
            conflicted = %conflicted.display(),
            "launching diff tool"
        );

        let extra_args = DIFF_TOOLS
            .iter()
            .find(|(name, _)| *name == self.tool)
            .map(|(_, args)| *args)
            .unwrap_or_default();

        let mut cmd = std::process::Command::new(&self.tool);
        cmd.args(extra_args).arg(original).arg(conflicted);

        let launch = |e| DiffError::LaunchFailed {
            tool: self.tool.clone(),
            source: e,
        };

        if is_gui_tool(&self.tool) {
            cmd.spawn().map_err(launch)?;
        } else {
            cmd.status().map_err(launch)?;
        }
        Ok(())
    }
}

/// Check if a tool is available in PATH
fn is_available(tool: &str) -> bool {
    std::process::Command::new("which")
        .arg(tool)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Whether a tool is a GUI application (runs in background)
fn is_gui_tool(tool: &str) -> bool {
    matches!(tool, "meld" | "kdiff3" | "kompare" | "diffuse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_finds_something_on_linux() {
        // diff itself is part of the fallback chain and should exist.
        assert!(DiffViewer::detect().is_ok());
    }

    #[test]
    fn test_is_gui_tool() {
        assert!(is_gui_tool("meld"));
        assert!(is_gui_tool("kdiff3"));
        assert!(!is_gui_tool("vimdiff"));
        assert!(!is_gui_tool("diff"));
    }

    #[test]
    fn test_is_available_nonexistent() {
        assert!(!is_available("no_such_diff_tool_xyz_123"));
    }
}
