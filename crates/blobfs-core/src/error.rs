//! Error types for blobfs-core

use std::fmt;
use std::io::ErrorKind;
use thiserror::Error;

/// A single key that could not be removed during a batched delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// Object key that survived the delete
    pub key: String,
    /// Reason reported by the store
    pub reason: String,
}

impl fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

/// Filesystem-domain errors surfaced by the facade
#[derive(Error, Debug)]
pub enum FsError {
    /// Malformed `scheme://bucket/key` address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Target object or bucket does not exist
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// Store rejected the request (status 403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Store rejected the request for any other reason, or the caller passed
    /// an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A path component that must be a directory is a file
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Refusing to replace an existing entry
    #[error("File exists: {0}")]
    FileExists(String),

    /// Operation deliberately unsupported by object stores
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Some keys of a batched delete failed
    #[error("{} errors occurred during deleting '{path}': {}", .failures.len(), join_failures(.failures))]
    AggregateDelete {
        /// Path whose tree was being removed
        path: String,
        /// Every key that failed, with its reason
        failures: Vec<DeleteFailure>,
    },

    /// Internal invariant violated; indicates a defect, never user input
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Store failure without a status code
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),
}

fn join_failures(failures: &[DeleteFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FsError {
    /// The `std::io::ErrorKind` a filesystem caller would expect for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            FsError::InvalidAddress(_) | FsError::InvalidArgument(_) => ErrorKind::InvalidInput,
            FsError::NotADirectory(_) => ErrorKind::NotADirectory,
            FsError::FileExists(_) => ErrorKind::AlreadyExists,
            FsError::NotImplemented(_) => ErrorKind::Unsupported,
            FsError::Io(err) => err.kind(),
            _ => ErrorKind::Other,
        }
    }

    /// Whether this error means the target is absent
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Io(io_err) => io_err,
            other => std::io::Error::new(other.kind(), other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
