//! Fault injection for store clients

use blobfs_core::{
    BucketInfo, ListQuery, ObjectInfo, StoreClient, StoreEntry, StoreError, StoreResult,
};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

/// A [`StoreClient`] decorator that fails on demand and counts calls
#[derive(Debug)]
pub struct FlakyStore {
    inner: Arc<dyn StoreClient>,
    failing_deletes: Mutex<BTreeSet<String>>,
    injected_status: Mutex<Option<u16>>,
    stray_keys: Mutex<Vec<String>>,
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn StoreClient>) -> Self {
        Self {
            inner,
            failing_deletes: Mutex::new(BTreeSet::new()),
            injected_status: Mutex::new(None),
            stray_keys: Mutex::new(Vec::new()),
            calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// Make every delete of `key` fail with a 503
    pub fn fail_delete(&self, key: impl Into<String>) {
        lock(&self.failing_deletes).insert(key.into());
    }

    /// Make every call fail with status `code` until [`FlakyStore::heal`]
    pub fn fail_all_with(&self, code: u16) {
        *lock(&self.injected_status) = Some(code);
    }

    /// Append `key` to every unbounded recursive listing, whatever the prefix
    pub fn add_stray_key(&self, key: impl Into<String>) {
        lock(&self.stray_keys).push(key.into());
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        *lock(&self.injected_status) = None;
        lock(&self.failing_deletes).clear();
        lock(&self.stray_keys).clear();
    }

    /// How often `operation` was called
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    fn enter(&self, operation: &'static str) -> StoreResult<()> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match *lock(&self.injected_status) {
            Some(code) => Err(StoreError::status(
                code,
                format!("injected failure in {}", operation),
            )),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StoreClient for FlakyStore {
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>> {
        self.enter("list_buckets")?;
        self.inner.list_buckets()
    }

    fn get_bucket(&self, name: &str) -> StoreResult<BucketInfo> {
        self.enter("get_bucket")?;
        self.inner.get_bucket(name)
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>> {
        self.enter("get_object")?;
        self.inner.get_object(bucket, key)
    }

    fn list_objects(&self, bucket: &str, query: &ListQuery) -> StoreResult<Vec<StoreEntry>> {
        self.enter("list_objects")?;
        let mut entries = self.inner.list_objects(bucket, query)?;
        if query.delimiter.is_none() && query.max_results.is_none() {
            entries.extend(
                lock(&self.stray_keys)
                    .iter()
                    .map(|key| StoreEntry::Object(ObjectInfo::placeholder(bucket, key.as_str()))),
            );
        }
        Ok(entries)
    }

    fn upload_bytes(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<ObjectInfo> {
        self.enter("upload_bytes")?;
        self.inner.upload_bytes(bucket, key, data)
    }

    fn download(&self, object: &ObjectInfo) -> StoreResult<Bytes> {
        self.enter("download")?;
        self.inner.download(object)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.enter("delete_object")?;
        if lock(&self.failing_deletes).contains(key) {
            return Err(StoreError::status(503, "backend error"));
        }
        self.inner.delete_object(bucket, key)
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        self.enter("copy_object")?;
        self.inner
            .copy_object(src_bucket, src_key, dst_bucket, dst_key)
    }

    fn rename_object(&self, bucket: &str, old_key: &str, new_key: &str) -> StoreResult<()> {
        self.enter("rename_object")?;
        self.inner.rename_object(bucket, old_key, new_key)
    }
}
