//! Content comparison
//!
//! Classifies a matched pair as identical, different, or erroring. The
//! size pre-check is load-bearing: when sizes differ the verdict is
//! `Different` and neither file's content is ever opened. Equal-sized
//! pairs are then streamed in 64 KiB chunks, either through SHA-256
//! (`hash`) or side-by-side (`byte`, diverging on the first mismatching
//! chunk). Read failures are always `Error`, never `Different`.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use deconflict_core::domain::{CompareMethod, CompareVerdict, Comparison};

/// Fixed read block size for hashing and byte comparison
const CHUNK_SIZE: usize = 64 * 1024;

/// Classifies matched pairs by content
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    method: CompareMethod,
}

impl Comparator {
    /// Creates a comparator using the given method
    pub fn new(method: CompareMethod) -> Self {
        Self { method }
    }

    /// Compares `original` against `conflicted`
    pub async fn compare(&self, original: &Path, conflicted: &Path) -> Comparison {
        let (size_original, modified_original) = match stat(original).await {
            Ok(s) => s,
            Err(e) => return self.error(format!("cannot stat {}: {e}", original.display())),
        };
        let (size_conflicted, modified_conflicted) = match stat(conflicted).await {
            Ok(s) => s,
            Err(e) => return self.error(format!("cannot stat {}: {e}", conflicted.display())),
        };

        let mut report = Comparison {
            verdict: CompareVerdict::Different,
            method: self.method,
            reason: String::new(),
            size_original,
            size_conflicted,
            modified_original,
            modified_conflicted,
            hash_original: None,
            hash_conflicted: None,
        };

        // Size mismatch settles it without touching content.
        if size_original != size_conflicted {
            report.reason = "different file sizes".to_string();
            return report;
        }

        if size_original == 0 {
            report.verdict = CompareVerdict::Identical;
            report.reason = "files are identical".to_string();
            return report;
        }

        match self.method {
            CompareMethod::Hash => {
                let hash_original = match hash_file(original).await {
                    Ok(h) => h,
                    Err(e) => {
                        return self
                            .error(format!("cannot read {}: {e}", original.display()))
                            .with_sizes(&report)
                    }
                };
                let hash_conflicted = match hash_file(conflicted).await {
                    Ok(h) => h,
                    Err(e) => {
                        return self
                            .error(format!("cannot read {}: {e}", conflicted.display()))
                            .with_sizes(&report)
                    }
                };

                let identical = hash_original == hash_conflicted;
                report.hash_original = Some(hash_original);
                report.hash_conflicted = Some(hash_conflicted);
                if identical {
                    report.verdict = CompareVerdict::Identical;
                    report.reason = "files are identical".to_string();
                } else {
                    report.reason = "different content (hash mismatch)".to_string();
                }
                report
            }
            CompareMethod::Byte => match bytes_equal(original, conflicted).await {
                Ok(true) => {
                    report.verdict = CompareVerdict::Identical;
                    report.reason = "files are identical".to_string();
                    report
                }
                Ok(false) => {
                    report.reason = "different content (byte comparison)".to_string();
                    report
                }
                Err(e) => self.error(format!("read failed: {e}")).with_sizes(&report),
            },
        }
    }

    fn error(&self, reason: String) -> Comparison {
        debug!(reason = %reason, "comparison error");
        Comparison {
            verdict: CompareVerdict::Error,
            method: self.method,
            reason,
            size_original: 0,
            size_conflicted: 0,
            modified_original: None,
            modified_conflicted: None,
            hash_original: None,
            hash_conflicted: None,
        }
    }
}

trait WithSizes {
    fn with_sizes(self, from: &Comparison) -> Comparison;
}

impl WithSizes for Comparison {
    fn with_sizes(mut self, from: &Comparison) -> Comparison {
        self.size_original = from.size_original;
        self.size_conflicted = from.size_conflicted;
        self.modified_original = from.modified_original;
        self.modified_conflicted = from.modified_conflicted;
        self
    }
}

async fn stat(path: &Path) -> std::io::Result<(u64, Option<DateTime<Utc>>)> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    let modified = meta.modified().ok().and_then(to_utc);
    Ok((meta.len(), modified))
}

fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()))
}

/// Streams a file through SHA-256 and returns the hex digest
async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Streams both files in matching chunks, diverging on the first mismatch
async fn bytes_equal(a: &Path, b: &Path) -> std::io::Result<bool> {
    let mut file_a = File::open(a).await?;
    let mut file_b = File::open(b).await?;
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    loop {
        let n_a = read_chunk(&mut file_a, &mut buf_a).await?;
        let n_b = read_chunk(&mut file_b, &mut buf_b).await?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Fills `buf` as far as the file allows; a short count means EOF
async fn read_chunk(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
