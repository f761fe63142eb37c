//! Conflicted/original pairing
//!
//! Pairing is deliberately literal string-transform logic: a filename is
//! conflicted when it carries one of two known marker substrings, and the
//! original's name is that filename with exactly the marker removed. No
//! fuzzy matching, case-sensitive, extension and directory preserved.

use std::path::PathBuf;

use tracing::debug;

use deconflict_core::domain::{ConflictCandidate, MatchedPair};

/// Marker substrings a sync client inserts into duplicate names,
/// in the order they are tried
pub const CONFLICT_MARKERS: &[&str] = &[" [conflicted]", " (conflicted)"];

/// Returns true if `name` carries a conflict marker immediately before
/// the extension or at the end of the name
pub fn is_conflicted_name(name: &str) -> bool {
    marker_position(name).is_some()
}

/// Derives the original filename by removing exactly one marker occurrence
///
/// Returns `None` when `name` carries no recognized marker.
pub fn strip_conflict_marker(name: &str) -> Option<String> {
    let (idx, marker) = marker_position(name)?;
    let mut stripped = String::with_capacity(name.len() - marker.len());
    stripped.push_str(&name[..idx]);
    stripped.push_str(&name[idx + marker.len()..]);
    Some(stripped)
}

/// Finds a marker occurrence that sits before the extension or at the end
fn marker_position(name: &str) -> Option<(usize, &'static str)> {
    for marker in CONFLICT_MARKERS {
        for (idx, _) in name.match_indices(marker) {
            let rest = &name[idx + marker.len()..];
            if rest.is_empty() || rest.starts_with('.') {
                return Some((idx, *marker));
            }
        }
    }
    None
}

/// Binds candidates to their originals
pub struct Matcher;

impl Matcher {
    /// Pairs a candidate with its derived original
    ///
    /// The pair is orphaned when the derived path does not exist, is not a
    /// regular file, or would itself carry a conflict marker (an original
    /// is never a conflicted-marked path).
    pub async fn pair(candidate: ConflictCandidate) -> MatchedPair {
        let Some(original_name) = strip_conflict_marker(candidate.file_name()) else {
            debug!(path = %candidate.path.display(), "no marker in candidate name");
            return MatchedPair::new(candidate, None);
        };

        if is_conflicted_name(&original_name) {
            debug!(
                path = %candidate.path.display(),
                derived = %original_name,
                "derived original still carries a marker; treating as orphaned"
            );
            return MatchedPair::new(candidate, None);
        }

        let original: PathBuf = candidate.directory.join(&original_name);
        let exists_as_file = match tokio::fs::metadata(&original).await {
            Ok(meta) => meta.is_file(),
            Err(_) => false,
        };

        if exists_as_file {
            MatchedPair::new(candidate, Some(original))
        } else {
            debug!(
                conflicted = %candidate.path.display(),
                derived = %original.display(),
                "no original on disk; orphaned conflict"
            );
            MatchedPair::new(candidate, None)
        }
    }
}
