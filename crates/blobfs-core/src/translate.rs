//! Store failure translation
//!
//! `TranslatedStore` wraps a [`StoreClient`] and exposes the same operations
//! returning [`FsError`]. The filesystem never talks to the raw client, so
//! every store-facing call goes through [`translate`] exactly once.

use crate::client::{
    BucketInfo, DeleteReport, ListQuery, ObjectInfo, StoreClient, StoreEntry, StoreError,
    StoreResult,
};
use crate::{FsError, Result};
use bytes::Bytes;
use std::io::Read;
use std::sync::Arc;
use tracing::error;

/// Map a store failure onto the filesystem error taxonomy
///
/// 403 becomes `PermissionDenied`, 404 `NotFound`, any other status
/// `InvalidArgument`. Failures without a status pass through unchanged.
pub fn translate_error(err: StoreError) -> FsError {
    match err {
        StoreError::Status { code: 403, message } => FsError::PermissionDenied(message),
        StoreError::Status { code: 404, message } => FsError::NotFound(message),
        StoreError::Status { message, .. } => FsError::InvalidArgument(message),
        StoreError::Transport(message) => FsError::Transport(message),
        StoreError::Io(err) => FsError::Io(err),
    }
}

/// Translate the outcome of one store call, logging failures
pub fn translate<T>(operation: &str, result: StoreResult<T>) -> Result<T> {
    result.map_err(|err| {
        error!(operation, error = %err, "object store error");
        translate_error(err)
    })
}

/// A store client whose failures are already filesystem errors
#[derive(Debug, Clone)]
pub struct TranslatedStore {
    inner: Arc<dyn StoreClient>,
}

impl TranslatedStore {
    pub fn new(inner: Arc<dyn StoreClient>) -> Self {
        Self { inner }
    }

    /// The wrapped client
    pub fn inner(&self) -> &Arc<dyn StoreClient> {
        &self.inner
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        translate("list_buckets", self.inner.list_buckets())
    }

    pub fn get_bucket(&self, name: &str) -> Result<BucketInfo> {
        translate("get_bucket", self.inner.get_bucket(name))
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        translate("get_object", self.inner.get_object(bucket, key))
    }

    pub fn list_objects(&self, bucket: &str, query: &ListQuery) -> Result<Vec<StoreEntry>> {
        translate("list_objects", self.inner.list_objects(bucket, query))
    }

    pub fn upload_bytes(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectInfo> {
        translate("upload_bytes", self.inner.upload_bytes(bucket, key, data))
    }

    pub fn upload_reader(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut dyn Read,
    ) -> Result<ObjectInfo> {
        translate("upload_reader", self.inner.upload_reader(bucket, key, reader))
    }

    pub fn download(&self, object: &ObjectInfo) -> Result<Bytes> {
        translate("download", self.inner.download(object))
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        translate("delete_object", self.inner.delete_object(bucket, key))
    }

    pub fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<DeleteReport> {
        translate("delete_objects", self.inner.delete_objects(bucket, keys))
    }

    pub fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        translate(
            "copy_object",
            self.inner
                .copy_object(src_bucket, src_key, dst_bucket, dst_key),
        )
    }

    pub fn rename_object(&self, bucket: &str, old_key: &str, new_key: &str) -> Result<()> {
        translate(
            "rename_object",
            self.inner.rename_object(bucket, old_key, new_key),
        )
    }
}
