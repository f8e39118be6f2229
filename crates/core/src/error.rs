//! Error types for marklog
//!
//! Every fallible operation in the workspace ends in [`Error`]. Crate-local
//! error enums (configuration, segment files) convert into it, and callers
//! branch on [`Error::kind`] rather than on individual variants.

use std::io;
use thiserror::Error;

/// Result type alias for marklog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification reported to replication callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No log data covers the requested range
    NotFound,
    /// Malformed marker header, kind or payload
    Corrupt,
    /// Referenced database or collection vanished mid-scan
    Dropped,
    /// Defect: a state the scan should never reach, or a resource failure
    Internal,
    /// I/O failure while opening or mapping segment files
    Io,
    /// Invalid configuration
    Config,
}

impl ErrorKind {
    /// Stable lowercase name, used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Corrupt => "corrupt",
            ErrorKind::Dropped => "dropped",
            ErrorKind::Internal => "internal",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error type for marklog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No log data covers the requested range
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed data in a segment
    #[error("Data corruption: {0}")]
    Corrupt(String),

    /// Database or collection dropped while scanning
    #[error("Dropped: {0}")]
    Dropped(String),

    /// Internal defect
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error (file open, mmap)
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::Dropped(_) => ErrorKind::Dropped,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Io(_) => ErrorKind::Io,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Build a [`Error::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    /// Build a [`Error::Corrupt`].
    pub fn corrupt(message: impl Into<String>) -> Self {
        Error::Corrupt(message.into())
    }

    /// Build a [`Error::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Build a [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
