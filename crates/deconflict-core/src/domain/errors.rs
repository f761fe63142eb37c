//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Unknown comparison method name
    #[error("invalid comparison method '{0}' (expected 'hash' or 'byte')")]
    InvalidMethod(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidMethod("crc".to_string());
        assert_eq!(
            err.to_string(),
            "invalid comparison method 'crc' (expected 'hash' or 'byte')"
        );
    }
}
