use blobfs_core::StoreError;
use thiserror::Error;

/// Errors raised while building or driving cloud stores
#[derive(Error, Debug)]
pub enum CloudError {
    /// Failure reported by `object_store`
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key that cannot be expressed as an object path
    #[error("Invalid cloud path: {0}")]
    InvalidPath(String),

    /// The shared runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider requested without its cargo feature enabled
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Result type for cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;

/// HTTP-style status for an `object_store` failure, if it has one
pub(crate) fn status_code(err: &object_store::Error) -> Option<u16> {
    use object_store::Error as E;

    match err {
        E::NotFound { .. } => Some(404),
        E::PermissionDenied { .. } => Some(403),
        E::Unauthenticated { .. } => Some(401),
        E::AlreadyExists { .. } => Some(409),
        E::Precondition { .. } => Some(412),
        E::NotModified { .. } => Some(304),
        E::NotSupported { .. } | E::NotImplemented => Some(501),
        E::InvalidPath { .. } => Some(400),
        _ => None,
    }
}

/// Convert an `object_store` failure into a store client error
pub(crate) fn store_error(err: object_store::Error) -> StoreError {
    let message = err.to_string();
    match status_code(&err) {
        Some(code) => StoreError::status(code, message),
        None => StoreError::Transport(message),
    }
}

impl From<CloudError> for StoreError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::ObjectStore(err) => store_error(err),
            CloudError::Io(err) => StoreError::Io(err),
            CloudError::InvalidPath(message) => StoreError::status(400, message),
            other => StoreError::Transport(other.to_string()),
        }
    }
}

impl From<CloudError> for std::io::Error {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Io(io_err) => io_err,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> object_store::Error {
        object_store::Error::NotFound {
            path: "b/k".to_string(),
            source: "missing".into(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(store_error(not_found()).code(), Some(404));

        let generic = object_store::Error::Generic {
            store: "GCS",
            source: "connection reset".into(),
        };
        assert!(matches!(store_error(generic), StoreError::Transport(_)));
    }

    #[test]
    fn test_cloud_error_into_store_error() {
        let err: StoreError = CloudError::InvalidPath("a//b".into()).into();
        assert_eq!(err.code(), Some(400));

        let err: StoreError = CloudError::ObjectStore(not_found()).into();
        assert_eq!(err.code(), Some(404));

        let err: StoreError = CloudError::Runtime("no threads".into()).into();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
