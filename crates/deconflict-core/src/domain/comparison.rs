//! Content comparison results
//!
//! The comparator classifies a matched pair as identical, different, or
//! erroring, tagged with the method used. For hash mode the two digests are
//! carried along so the ledger can detect content drift across runs without
//! re-reading files.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// How file content is compared once sizes match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMethod {
    /// Stream both files through SHA-256 and compare digests
    Hash,
    /// Stream both files in matching chunks and compare bytes
    Byte,
}

impl fmt::Display for CompareMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareMethod::Hash => "hash",
            CompareMethod::Byte => "byte",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CompareMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(CompareMethod::Hash),
            "byte" => Ok(CompareMethod::Byte),
            other => Err(DomainError::InvalidMethod(other.to_string())),
        }
    }
}

/// The classification of a matched pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareVerdict {
    /// Content is byte-for-byte identical
    Identical,
    /// Content (or size) differs
    Different,
    /// The pair could not be compared
    Error,
}

/// Full comparison report for one matched pair
///
/// `reason` is the human-readable explanation ("different file sizes",
/// "files are identical", an I/O error message, ...). Digests are only
/// populated when content was actually hashed; a size-mismatch short-circuit
/// leaves them `None`.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub verdict: CompareVerdict,
    pub method: CompareMethod,
    pub reason: String,
    pub size_original: u64,
    pub size_conflicted: u64,
    pub modified_original: Option<DateTime<Utc>>,
    pub modified_conflicted: Option<DateTime<Utc>>,
    pub hash_original: Option<String>,
    pub hash_conflicted: Option<String>,
}

impl Comparison {
    /// Returns true if the pair was classified identical
    pub fn is_identical(&self) -> bool {
        self.verdict == CompareVerdict::Identical
    }

    /// Returns true if the pair could not be compared
    pub fn is_error(&self) -> bool {
        self.verdict == CompareVerdict::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("hash".parse::<CompareMethod>().unwrap(), CompareMethod::Hash);
        assert_eq!("byte".parse::<CompareMethod>().unwrap(), CompareMethod::Byte);
        assert!("sha256".parse::<CompareMethod>().is_err());
        // Parsing is case-sensitive, like the flag values it mirrors
        assert!("Hash".parse::<CompareMethod>().is_err());
    }

    #[test]
    fn test_method_display_roundtrip() {
        for method in [CompareMethod::Hash, CompareMethod::Byte] {
            let parsed: CompareMethod = method.to_string().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_string(&CompareMethod::Hash).unwrap();
        assert_eq!(json, "\"hash\"");
        let back: CompareMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CompareMethod::Hash);
    }
}
