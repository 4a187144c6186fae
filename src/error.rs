//! Error types and handling infrastructure for tailfan.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types and `anyhow` for application-level error handling at the
//! binary boundary.
//!
//! ## Design Principles
//!
//! - **Distinguishable conditions**: a missing file is its own variant so reopen
//!   mode can substitute a start offset of zero instead of failing
//! - **Context preservation**: underlying I/O errors are kept as sources
//! - **Consistency**: standardized Result type across all modules

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tailfan operations.
///
/// This enum covers all possible error conditions that can occur during
/// tail positioning, file watching, and output writing.
#[derive(Error, Debug)]
pub enum TailfanError {
    /// File missing at startup, or removed while following without reopen mode.
    ///
    /// Callers that intend to wait for file creation match on this variant
    /// specifically; every other I/O failure is fatal.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File system related errors (open, seek, read, metadata)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Change notification backend failed to initialize or register a watch
    #[error("Watch setup failed: {message}")]
    WatchError { message: String },

    /// Writing a formatted line to the shared output sink failed
    #[error("Write to output failed")]
    WriteError {
        #[source]
        source: std::io::Error,
    },

    /// Invalid run configuration
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for tailfan operations.
///
/// This type alias provides a consistent error handling interface across
/// all modules in the tailfan codebase.
pub type Result<T> = std::result::Result<T, TailfanError>;

impl TailfanError {
    /// Create a FileNotFound for the given path
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a WatchError with a descriptive message
    pub fn watch(message: impl Into<String>) -> Self {
        Self::WatchError {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

// Automatic conversion from notify errors; the backend's own message carries
// the useful detail.
impl From<notify::Error> for TailfanError {
    fn from(err: notify::Error) -> Self {
        Self::WatchError {
            message: err.to_string(),
        }
    }
}
