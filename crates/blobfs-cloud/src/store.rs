//! `StoreClient` over `object_store` buckets
//!
//! `object_store` paths cannot end in `/`, so a directory marker `key/` is
//! stored as the object `key/.folder` and mapped back on the way out. Listings
//! are served by listing the enclosing directory and filtering on the raw
//! string prefix, which gives the same results a bucket/blob service would.

use crate::config::{CloudConfig, Provider};
use crate::error::{store_error, status_code};
use crate::runtime::get_runtime;
use crate::{CloudError, Result};
use blobfs_core::{
    BucketInfo, ListQuery, ObjectInfo, StoreClient, StoreEntry, StoreError, StoreResult,
};
use bytes::Bytes;
use chrono::Utc;
use futures_util::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::runtime::Runtime;
use tracing::{debug, trace};

/// Object name standing in for a directory marker
pub const MARKER_FILE: &str = ".folder";

/// A blocking [`StoreClient`] backed by one `ObjectStore` per bucket
///
/// Async calls are driven on a shared Tokio runtime, so methods must not be
/// called from inside an async context.
#[derive(Debug)]
pub struct CloudStoreClient {
    config: CloudConfig,
    stores: RwLock<BTreeMap<String, Arc<dyn ObjectStore>>>,
    runtime: Arc<Runtime>,
}

impl CloudStoreClient {
    /// Build a client with a store for every configured bucket
    ///
    /// # Errors
    /// Returns an error if the runtime cannot start or a store cannot be built
    pub fn new(config: CloudConfig) -> Result<Self> {
        let runtime = get_runtime()?;
        let mut stores = BTreeMap::new();
        for bucket in &config.buckets {
            stores.insert(bucket.clone(), build_store(&config, bucket)?);
        }
        debug!(provider = %config.provider, buckets = stores.len(), "created cloud store client");

        Ok(Self {
            config,
            stores: RwLock::new(stores),
            runtime,
        })
    }

    /// In-memory client exposing `buckets`
    pub fn in_memory<I, S>(buckets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CloudConfig::memory(buckets))
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Serve `bucket` from `store`, replacing any store registered before
    pub fn register(&self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) {
        let bucket = bucket.into();
        debug!(bucket = %bucket, store = %store, "registered bucket store");
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket, store);
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn store(&self, bucket: &str) -> StoreResult<Arc<dyn ObjectStore>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("bucket '{}' does not exist", bucket)))
    }

    fn head(&self, store: &dyn ObjectStore, path: &ObjectPath) -> StoreResult<Option<ObjectMeta>> {
        match self.block_on(store.head(path)) {
            Ok(meta) => Ok(Some(meta)),
            Err(err) if status_code(&err) == Some(404) => Ok(None),
            Err(err) => Err(store_error(err)),
        }
    }

    fn require(&self, store: &dyn ObjectStore, bucket: &str, key: &str) -> StoreResult<ObjectPath> {
        let path = object_path(key)?;
        match self.head(store, &path)? {
            Some(_) => Ok(path),
            None => Err(StoreError::not_found(format!(
                "object '{}' not found in bucket '{}'",
                key, bucket
            ))),
        }
    }

    fn list_recursive(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        prefix: &str,
        parent: Option<&ObjectPath>,
    ) -> StoreResult<Vec<StoreEntry>> {
        let metas: Vec<ObjectMeta> = self
            .block_on(store.list(parent).try_collect())
            .map_err(store_error)?;

        Ok(metas
            .iter()
            .filter_map(|meta| {
                let key = object_key(&meta.location);
                (!key.is_empty() && key.starts_with(prefix))
                    .then(|| StoreEntry::Object(object_info(bucket, key, meta)))
            })
            .collect())
    }

    fn list_delimited(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        prefix: &str,
        parent: Option<&ObjectPath>,
    ) -> StoreResult<Vec<StoreEntry>> {
        let listing = self
            .block_on(store.list_with_delimiter(parent))
            .map_err(store_error)?;

        let objects = listing.objects.iter().filter_map(|meta| {
            let key = object_key(&meta.location);
            (!key.is_empty() && key.starts_with(prefix))
                .then(|| StoreEntry::Object(object_info(bucket, key, meta)))
        });
        let prefixes = listing.common_prefixes.iter().filter_map(|path| {
            let key = format!("{}/", path.as_ref());
            key.starts_with(prefix).then(|| StoreEntry::CommonPrefix {
                bucket: bucket.to_string(),
                prefix: key,
            })
        });
        Ok(objects.chain(prefixes).collect())
    }
}

/// Build the store serving `bucket` for the configured provider
fn build_store(config: &CloudConfig, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    match config.provider {
        Provider::Memory => Ok(Arc::new(InMemory::new())),
        #[cfg(feature = "gcp")]
        Provider::Gcs => {
            use object_store::gcp::GoogleCloudStorageBuilder;

            let mut builder = if config.allow_environment_credentials {
                GoogleCloudStorageBuilder::from_env()
            } else {
                GoogleCloudStorageBuilder::new()
            };
            builder = builder.with_bucket_name(bucket);
            if let Some(path) = &config.service_account_path {
                builder = builder.with_service_account_path(path.to_string_lossy());
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(feature = "aws")]
        Provider::S3 => {
            use object_store::aws::AmazonS3Builder;

            let mut builder = if config.allow_environment_credentials {
                AmazonS3Builder::from_env()
            } else {
                AmazonS3Builder::new()
            };
            builder = builder.with_bucket_name(bucket);
            if let Some(region) = &config.region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = &config.endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(feature = "azure")]
        Provider::Azure => {
            use object_store::azure::MicrosoftAzureBuilder;

            let builder = if config.allow_environment_credentials {
                MicrosoftAzureBuilder::from_env()
            } else {
                MicrosoftAzureBuilder::new()
            };
            Ok(Arc::new(builder.with_container_name(bucket).build()?))
        }
        #[allow(unreachable_patterns)]
        other => Err(CloudError::UnsupportedProvider(format!(
            "{} support is not compiled in",
            other
        ))),
    }
}

/// Object path for a key; `dir/` becomes `dir/.folder`
fn object_path(key: &str) -> StoreResult<ObjectPath> {
    let raw = match key.strip_suffix('/') {
        Some(dir) => format!("{}/{}", dir, MARKER_FILE),
        None => key.to_string(),
    };
    ObjectPath::parse(&raw)
        .map_err(|e| StoreError::from(CloudError::InvalidPath(format!("{}: {}", key, e))))
}

/// Key for an object path; the inverse of [`object_path`]
fn object_key(path: &ObjectPath) -> String {
    let raw = path.as_ref();
    match raw.strip_suffix(MARKER_FILE) {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir.to_string(),
        _ => raw.to_string(),
    }
}

/// The directory to list for a raw prefix: everything before its last `/`
fn list_parent(prefix: &str) -> StoreResult<Option<ObjectPath>> {
    match prefix.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => Ok(Some(object_path(dir)?)),
        _ => Ok(None),
    }
}

fn object_info(bucket: &str, key: String, meta: &ObjectMeta) -> ObjectInfo {
    ObjectInfo {
        bucket: bucket.to_string(),
        key,
        size: Some(meta.size as u64),
        updated: Some(meta.last_modified),
    }
}

fn sort_key(entry: &StoreEntry) -> &str {
    match entry {
        StoreEntry::Object(object) => &object.key,
        StoreEntry::CommonPrefix { prefix, .. } => prefix,
        StoreEntry::Bucket(bucket) => &bucket.name,
    }
}

impl StoreClient for CloudStoreClient {
    fn list_buckets(&self) -> StoreResult<Vec<BucketInfo>> {
        Ok(self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(BucketInfo::new)
            .collect())
    }

    fn get_bucket(&self, name: &str) -> StoreResult<BucketInfo> {
        if self.store(name).is_ok() {
            return Ok(BucketInfo::new(name));
        }
        if self.config.provider == Provider::Memory {
            return Err(StoreError::not_found(format!(
                "bucket '{}' does not exist",
                name
            )));
        }

        let store = build_store(&self.config, name)?;
        // listing the root fails with the provider's status if the bucket is
        // missing or inaccessible
        self.block_on(store.list_with_delimiter(None))
            .map_err(store_error)?;
        self.register(name, store);
        Ok(BucketInfo::new(name))
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<ObjectInfo>> {
        let store = self.store(bucket)?;
        if key.is_empty() {
            return Ok(None);
        }
        let path = object_path(key)?;
        Ok(self
            .head(store.as_ref(), &path)?
            .map(|meta| object_info(bucket, key.to_string(), &meta)))
    }

    fn list_objects(&self, bucket: &str, query: &ListQuery) -> StoreResult<Vec<StoreEntry>> {
        let store = self.store(bucket)?;
        let parent = list_parent(&query.prefix)?;

        let mut entries = match query.delimiter {
            None => self.list_recursive(store.as_ref(), bucket, &query.prefix, parent.as_ref())?,
            Some('/') => {
                self.list_delimited(store.as_ref(), bucket, &query.prefix, parent.as_ref())?
            }
            Some(other) => {
                return Err(StoreError::status(
                    501,
                    format!("delimiter '{}' is not supported", other),
                ))
            }
        };

        entries.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
        if let Some(max) = query.max_results {
            entries.truncate(max);
        }
        trace!(bucket, prefix = %query.prefix, count = entries.len(), "listed objects");
        Ok(entries)
    }

    fn upload_bytes(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<ObjectInfo> {
        let store = self.store(bucket)?;
        let path = object_path(key)?;
        let size = data.len() as u64;

        self.block_on(store.put(&path, PutPayload::from(data)))
            .map_err(store_error)?;
        trace!(bucket, key, size, "uploaded object");

        Ok(ObjectInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: Some(size),
            updated: Some(Utc::now()),
        })
    }

    fn download(&self, object: &ObjectInfo) -> StoreResult<Bytes> {
        let store = self.store(&object.bucket)?;
        let path = object_path(&object.key)?;

        self.block_on(async { store.get(&path).await?.bytes().await })
            .map_err(store_error)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let store = self.store(bucket)?;
        let path = self.require(store.as_ref(), bucket, key)?;
        self.block_on(store.delete(&path)).map_err(store_error)
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        let src_store = self.store(src_bucket)?;
        let dst_store = self.store(dst_bucket)?;
        let from = object_path(src_key)?;
        let to = object_path(dst_key)?;

        if src_bucket == dst_bucket {
            return self
                .block_on(src_store.copy(&from, &to))
                .map_err(store_error);
        }

        // stores of different buckets cannot copy server-side
        self.block_on(async {
            let data = src_store.get(&from).await?.bytes().await?;
            dst_store.put(&to, PutPayload::from(data)).await?;
            Ok::<_, object_store::Error>(())
        })
        .map_err(store_error)
    }

    fn rename_object(&self, bucket: &str, old_key: &str, new_key: &str) -> StoreResult<()> {
        let store = self.store(bucket)?;
        let from = object_path(old_key)?;
        let to = object_path(new_key)?;
        self.block_on(store.rename(&from, &to))
            .map_err(store_error)
    }
}
