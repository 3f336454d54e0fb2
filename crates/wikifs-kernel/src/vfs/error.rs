//! Filesystem error types.

use std::io;
use thiserror::Error;

use crate::remote::RemoteError;

/// Error returned by path-level filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The name may not be written or removed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Fetching a document from the wiki failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::Remote(e) => io::Error::other(e),
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
