//! The object-store collaborator
//!
//! `StoreClient` is the capability the filesystem is built on. It speaks in
//! raw bucket names and string keys with object-store semantics: a key is an
//! opaque string, prefixes are plain string prefixes, and `/` only means
//! something when passed as a listing delimiter.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Read;
use thiserror::Error;

/// Failure reported by a store client
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered with an HTTP-style status code
    #[error("store returned {code}: {message}")]
    Status {
        /// Numeric status (401, 403, 404, 5xx, ...)
        code: u16,
        /// Reason given by the store
        message: String,
    },

    /// The request failed before the store produced a status
    #[error("transport failure: {0}")]
    Transport(String),

    /// Local I/O while feeding or draining a request
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Build a status error
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        StoreError::Status {
            code,
            message: message.into(),
        }
    }

    /// Shortcut for 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, message)
    }

    /// The status code, if the store produced one
    pub fn code(&self) -> Option<u16> {
        match self {
            StoreError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Handle to a bucket as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,
    /// Creation time, when the store reports one
    pub created: Option<DateTime<Utc>>,
}

impl BucketInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: None,
        }
    }
}

/// Metadata of one object, or a placeholder for a key that may not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Owning bucket
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Body length; `None` for a placeholder that was never fetched
    pub size: Option<u64>,
    /// Last modification time
    pub updated: Option<DateTime<Utc>>,
}

impl ObjectInfo {
    /// A handle bound to `key` that carries no store metadata
    pub fn placeholder(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            size: None,
            updated: None,
        }
    }

    /// Whether this handle came from the store rather than from
    /// [`ObjectInfo::placeholder`]
    pub fn is_placeholder(&self) -> bool {
        self.size.is_none()
    }
}

/// One result of a store enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEntry {
    /// A bucket
    Bucket(BucketInfo),
    /// A concrete object
    Object(ObjectInfo),
    /// All keys sharing `prefix` up to the next delimiter
    CommonPrefix {
        /// Owning bucket
        bucket: String,
        /// The shared prefix, including the trailing delimiter
        prefix: String,
    },
}

/// Parameters of a listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only keys starting with this string are returned
    pub prefix: String,
    /// Roll keys up into common prefixes at this delimiter
    pub delimiter: Option<char>,
    /// Stop after this many entries
    pub max_results: Option<usize>,
}

impl ListQuery {
    /// Every key under `prefix`, recursively
    pub fn recursive(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Immediate children of `prefix`, rolled up at `/`
    pub fn hierarchical(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: Some('/'),
            max_results: None,
        }
    }

    /// Limit the number of results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// Outcome of a batched delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Keys that were removed
    pub deleted: Vec<String>,
    /// Keys that failed, with the reason
    pub failed: Vec<(String, String)>,
}

/// Bucket/blob operations the filesystem needs from an object store
///
/// Implementations are blocking. Every method may fail with a
/// [`StoreError`]; the filesystem translates those into `FsError`s.
pub trait StoreClient: Send + Sync + fmt::Debug {
    /// All buckets visible to this client
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>>;

    /// A single bucket by name; 404 when it does not exist
    fn get_bucket(&self, name: &str) -> StoreResult<BucketInfo>;

    /// Object metadata, or `None` when no object has exactly this key
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>>;

    /// Enumerate objects (and common prefixes when a delimiter is set)
    fn list_objects(&self, bucket: &str, query: &ListQuery) -> StoreResult<Vec<StoreEntry>>;

    /// Store `data` as the full body of `key`, replacing any existing object
    fn upload_bytes(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<ObjectInfo>;

    /// Store everything `reader` yields as the body of `key`
    fn upload_reader(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut dyn Read,
    ) -> StoreResult<ObjectInfo> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.upload_bytes(bucket, key, Bytes::from(data))
    }

    /// The complete body of an object
    fn download(&self, object: &ObjectInfo) -> StoreResult<Bytes>;

    /// Remove one object
    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Remove many objects, collecting per-key failures instead of stopping
    fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<DeleteReport> {
        let mut report = DeleteReport::default();
        for key in keys {
            match self.delete_object(bucket, key) {
                Ok(()) => report.deleted.push(key.clone()),
                Err(err) => report.failed.push((key.clone(), err.to_string())),
            }
        }
        Ok(report)
    }

    /// Server-side copy of one object
    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()>;

    /// Rename one object inside a bucket
    fn rename_object(&self, bucket: &str, old_key: &str, new_key: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_code() {
        assert_eq!(StoreError::not_found("gone").code(), Some(404));
        assert_eq!(StoreError::Transport("reset".into()).code(), None);
        assert_eq!(
            StoreError::status(503, "busy").to_string(),
            "store returned 503: busy"
        );
    }

    #[test]
    fn test_list_query_builders() {
        let query = ListQuery::hierarchical("a/").max_results(1);
        assert_eq!(query.prefix, "a/");
        assert_eq!(query.delimiter, Some('/'));
        assert_eq!(query.max_results, Some(1));

        let query = ListQuery::recursive("a/");
        assert_eq!(query.delimiter, None);
        assert_eq!(query.max_results, None);
    }

    #[test]
    fn test_placeholder() {
        let object = ObjectInfo::placeholder("b", "new.txt");
        assert!(object.is_placeholder());
        assert_eq!(object.updated, None);
    }
}
