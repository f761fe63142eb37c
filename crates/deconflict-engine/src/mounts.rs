//! Mount boundary policy
//!
//! Decides, once per directory and before entering it, whether traversal
//! may descend. The default excludes cloud-sync and network mounts and
//! stays on the root's filesystem; `include_local_mounts` extends onto
//! other local filesystems, `cross_device` disables boundary checking
//! entirely. Classification failures are never fatal: a path that cannot
//! be stat'd simply skips the device check.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

/// Filesystem-type markers that flag a mount line as cloud or network
const CLOUD_FS_INDICATORS: &[&str] = &[
    "fuse", "osxfuse", "macfuse", "sshfs", "webdav", "smb", "afp", "nfs", "cifs",
];

/// Well-known cloud storage directories under the home directory
const CLOUD_DIR_PATTERNS: &[&str] = &[
    "Library/CloudStorage/*",
    "Library/Mobile Documents/*",
    "Dropbox*",
    "Google Drive*",
    "OneDrive*",
    "Box Sync*",
    "pCloud Drive*",
    "ShellFish/*",
];

/// The set of cloud/network mount points detected on this system
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<PathBuf>,
}

impl MountTable {
    /// Detects cloud and network mounts from the system mount table plus
    /// well-known cloud directories under the home directory
    ///
    /// Failure to run or parse `mount` yields an empty table with a
    /// warning; it never aborts the run.
    pub fn detect() -> Self {
        let mut mounts = Vec::new();

        match Command::new("mount").output() {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    if let Some(mount_point) = parse_cloud_mount_line(line) {
                        mounts.push(mount_point);
                    }
                }
            }
            Ok(output) => {
                warn!(status = ?output.status, "mount command failed; cloud mount detection disabled");
            }
            Err(e) => {
                warn!(error = %e, "could not run mount; cloud mount detection disabled");
            }
        }

        if let Some(home) = dirs::home_dir() {
            for pattern in CLOUD_DIR_PATTERNS {
                let full = home.join(pattern);
                let Some(full_str) = full.to_str() else {
                    continue;
                };
                let Ok(paths) = glob::glob(full_str) else {
                    continue;
                };
                for entry in paths.flatten() {
                    if entry.is_dir() {
                        mounts.push(entry);
                    }
                }
            }
        }

        debug!(count = mounts.len(), "cloud mount table built");
        Self { mounts }
    }

    /// An empty table; nothing is classified as cloud storage
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from known mount points (used by tests)
    pub fn with_mounts(mounts: Vec<PathBuf>) -> Self {
        Self { mounts }
    }

    /// Returns true if `path` lies under any detected cloud mount
    pub fn is_cloud_path(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if path_str.contains("/Library/Mobile Documents")
            || path_str.contains("/Library/CloudStorage")
        {
            return true;
        }
        self.mounts.iter().any(|m| path.starts_with(m))
    }
}

/// Parses one line of `mount` output, returning the mount point if the
/// line describes a cloud or network filesystem
///
/// Lines look like `something on /mount/point type fstype (options)`.
fn parse_cloud_mount_line(line: &str) -> Option<PathBuf> {
    let lowered = line.to_lowercase();
    if !CLOUD_FS_INDICATORS.iter().any(|i| lowered.contains(i)) {
        return None;
    }
    let after_on = line.split(" on ").nth(1)?;
    let mount_point = after_on.split(" type ").next()?.trim();
    if mount_point.is_empty() {
        return None;
    }
    Some(PathBuf::from(mount_point))
}

/// Why a directory will or will not be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descend {
    /// Enter the directory
    Yes,
    /// Excluded: under a cloud or network mount
    CloudMount,
    /// Excluded: on a different device than the scan root
    ForeignDevice,
}

/// Per-root traversal boundary policy
#[derive(Debug, Clone)]
pub struct TraversalPolicy {
    mounts: MountTable,
    cross_device: bool,
    include_local_mounts: bool,
    root_device: Option<u64>,
}

impl TraversalPolicy {
    /// Creates the policy for a scan rooted at `root`
    ///
    /// The root's device id anchors the same-filesystem check; if it
    /// cannot be determined the device check is skipped (logged, not
    /// fatal).
    pub fn new(
        mounts: MountTable,
        cross_device: bool,
        include_local_mounts: bool,
        root: &Path,
    ) -> Self {
        let root_device = if cross_device {
            None
        } else {
            let dev = device_id(root);
            if dev.is_none() {
                warn!(root = %root.display(), "could not determine root device id; device boundary check disabled");
            }
            dev
        };
        Self {
            mounts,
            cross_device,
            include_local_mounts,
            root_device,
        }
    }

    /// Decides whether traversal may enter `dir`
    pub fn should_descend(&self, dir: &Path) -> Descend {
        if self.cross_device {
            return Descend::Yes;
        }

        if self.mounts.is_cloud_path(dir) {
            return Descend::CloudMount;
        }

        if !self.include_local_mounts {
            if let Some(root_dev) = self.root_device {
                match device_id(dir) {
                    Some(dir_dev) if dir_dev == root_dev => {}
                    Some(_) => return Descend::ForeignDevice,
                    None => {
                        // Unclassifiable directories count as excluded.
                        warn!(dir = %dir.display(), "could not classify mount; excluding");
                        return Descend::ForeignDevice;
                    }
                }
            }
        }

        Descend::Yes
    }
}

/// Device id of a path, if the platform and filesystem expose one
#[cfg(unix)]
fn device_id(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.dev()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "stat failed for device check");
            None
        }
    }
}

#[cfg(not(unix))]
fn device_id(_path: &Path) -> Option<u64> {
    None
}
