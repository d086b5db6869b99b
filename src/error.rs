//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kdpfc operations
#[derive(Error, Debug)]
pub enum KdpfcError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data errors (dimension mismatch, assignment out of range)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Algorithm errors (sub-solver returned a malformed solution)
    #[error("Algorithm error: {message}")]
    Algorithm { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File not found errors
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Parse errors, `line` is 1-based
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A structural or monotonicity check failed
    #[error("Verification failed: {message}")]
    Verification { message: String },
}

/// Type alias for Results using KdpfcError
pub type Result<T> = std::result::Result<T, KdpfcError>;

impl KdpfcError {
    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create an algorithm error
    pub fn algorithm(message: impl Into<String>) -> Self {
        Self::Algorithm {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a verification error
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_line() {
        let err = KdpfcError::parse(7, "number of entries should be non-negative");
        assert_eq!(
            err.to_string(),
            "Parse error at line 7: number of entries should be non-negative"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: KdpfcError = io.into();
        assert!(matches!(err, KdpfcError::Io(_)));
    }

    #[test]
    fn test_file_not_found_display() {
        let err = KdpfcError::FileNotFound {
            path: PathBuf::from("/no/such/matrix.txt"),
        };
        assert!(err.to_string().contains("/no/such/matrix.txt"));
    }
}
