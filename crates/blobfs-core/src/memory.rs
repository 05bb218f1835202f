//! In-process object store
//!
//! Keeps raw string keys exactly as given, including trailing `/` markers, so
//! it behaves like a bucket/blob service for listings and prefixes.

use crate::client::{
    BucketInfo, ListQuery, ObjectInfo, StoreClient, StoreEntry, StoreError, StoreResult,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    updated: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Bucket {
    created: Option<DateTime<Utc>>,
    objects: BTreeMap<String, StoredObject>,
}

/// A [`StoreClient`] that keeps every bucket in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given empty buckets
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for name in names {
            store.create_bucket(name);
        }
        store
    }

    /// Add an empty bucket; existing buckets are left alone
    pub fn create_bucket(&self, name: impl Into<String>) {
        self.write()
            .entry(name.into())
            .or_insert_with(|| Bucket {
                created: Some(Utc::now()),
                objects: BTreeMap::new(),
            });
    }

    /// Every key currently stored in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Bucket>> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Bucket>> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn missing_bucket(name: &str) -> StoreError {
    StoreError::not_found(format!("bucket '{}' does not exist", name))
}

fn missing_object(bucket: &str, key: &str) -> StoreError {
    StoreError::not_found(format!("object '{}' not found in bucket '{}'", key, bucket))
}

fn info(bucket: &str, key: &str, object: &StoredObject) -> ObjectInfo {
    ObjectInfo {
        bucket: bucket.to_string(),
        key: key.to_string(),
        size: Some(object.data.len() as u64),
        updated: Some(object.updated),
    }
}

impl StoreClient for MemoryStore {
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>> {
        Ok(self
            .read()
            .iter()
            .map(|(name, bucket)| BucketInfo {
                name: name.clone(),
                created: bucket.created,
            })
            .collect())
    }

    fn get_bucket(&self, name: &str) -> StoreResult<BucketInfo> {
        self.read()
            .get(name)
            .map(|bucket| BucketInfo {
                name: name.to_string(),
                created: bucket.created,
            })
            .ok_or_else(|| missing_bucket(name))
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>> {
        let buckets = self.read();
        let objects = &buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?.objects;
        Ok(objects.get(key).map(|object| info(bucket, key, object)))
    }

    fn list_objects(&self, bucket: &str, query: &ListQuery) -> StoreResult<Vec<StoreEntry>> {
        let buckets = self.read();
        let objects = &buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?.objects;
        let limit = query.max_results.unwrap_or(usize::MAX);

        let mut entries = Vec::new();
        let mut seen_prefixes = BTreeSet::new();
        for (key, object) in objects.range(query.prefix.clone()..) {
            if entries.len() >= limit {
                break;
            }
            let Some(rest) = key.strip_prefix(query.prefix.as_str()) else {
                break;
            };

            let rolled_up = query
                .delimiter
                .and_then(|delimiter| rest.find(delimiter).map(|idx| (idx, delimiter)));
            match rolled_up {
                Some((idx, delimiter)) => {
                    let prefix = format!(
                        "{}{}{}",
                        query.prefix,
                        &rest[..idx],
                        delimiter
                    );
                    if seen_prefixes.insert(prefix.clone()) {
                        entries.push(StoreEntry::CommonPrefix {
                            bucket: bucket.to_string(),
                            prefix,
                        });
                    }
                }
                None => entries.push(StoreEntry::Object(info(bucket, key, object))),
            }
        }
        Ok(entries)
    }

    fn upload_bytes(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<ObjectInfo> {
        let mut buckets = self.write();
        let objects = &mut buckets
            .get_mut(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .objects;
        let object = StoredObject {
            data,
            updated: Utc::now(),
        };
        let result = info(bucket, key, &object);
        objects.insert(key.to_string(), object);
        Ok(result)
    }

    fn download(&self, object: &ObjectInfo) -> StoreResult<Bytes> {
        let buckets = self.read();
        let objects = &buckets
            .get(&object.bucket)
            .ok_or_else(|| missing_bucket(&object.bucket))?
            .objects;
        objects
            .get(&object.key)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| missing_object(&object.bucket, &object.key))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let mut buckets = self.write();
        let objects = &mut buckets
            .get_mut(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .objects;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| missing_object(bucket, key))
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        let mut buckets = self.write();
        let source = buckets
            .get(src_bucket)
            .ok_or_else(|| missing_bucket(src_bucket))?
            .objects
            .get(src_key)
            .ok_or_else(|| missing_object(src_bucket, src_key))?
            .data
            .clone();

        buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| missing_bucket(dst_bucket))?
            .objects
            .insert(
                dst_key.to_string(),
                StoredObject {
                    data: source,
                    updated: Utc::now(),
                },
            );
        Ok(())
    }

    fn rename_object(&self, bucket: &str, old_key: &str, new_key: &str) -> StoreResult<()> {
        let mut buckets = self.write();
        let objects = &mut buckets
            .get_mut(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .objects;
        let object = objects
            .remove(old_key)
            .ok_or_else(|| missing_object(bucket, old_key))?;
        objects.insert(new_key.to_string(), object);
        Ok(())
    }
}
