//! The filesystem facade
//!
//! `BlobFileSystem` turns bucket/blob operations into path-based filesystem
//! calls. Directories do not exist in the store: a directory is either a
//! zero-byte marker object whose key ends in `/`, or simply the common prefix
//! of the keys below it.

use crate::client::{BucketInfo, ListQuery, ObjectInfo, StoreClient, StoreEntry};
use crate::config::FsConfig;
use crate::error::DeleteFailure;
use crate::stat::ObjectStat;
use crate::stream::{ObjectReader, OpenMode};
use crate::translate::TranslatedStore;
use crate::uri::{normalize_key, with_separator, Address, Scheme};
use crate::{FsError, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{Seek, SeekFrom};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, trace, warn};

const TRASH_UNSUPPORTED: &str = "Moving to trash is not implemented for object stores";

/// Path-based filesystem over a bucket/blob store
#[derive(Debug)]
pub struct BlobFileSystem {
    store: TranslatedStore,
    scheme: Scheme,
    config: FsConfig,
    /// Lazily filled from `list_buckets`, extended on misses, never evicted
    buckets: Mutex<Option<BTreeMap<String, BucketInfo>>>,
}

impl BlobFileSystem {
    /// Create a filesystem over `client`
    pub fn new(client: Arc<dyn StoreClient>, config: FsConfig) -> Self {
        Self {
            store: TranslatedStore::new(client),
            scheme: config.scheme(),
            config,
            buckets: Mutex::new(None),
        }
    }

    /// Create a filesystem with the default `gs://` configuration
    pub fn with_defaults(client: Arc<dyn StoreClient>) -> Self {
        Self::new(client, FsConfig::default())
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &TranslatedStore {
        &self.store
    }

    pub fn is_root(&self, path: &str) -> bool {
        self.scheme.is_root(path)
    }

    pub fn join<I, S>(&self, components: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scheme.join(components)
    }

    pub fn normpath(&self, path: &str) -> String {
        self.scheme.normpath(path)
    }

    /// Object stores have no users; accepted for interface compatibility
    pub fn set_user(&self, user: &str) {
        trace!(user, "ignoring user switch");
    }

    fn with_bucket_cache<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, BucketInfo>) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            let listed = self.store.list_buckets()?;
            debug!(count = listed.len(), "initialized bucket cache");
            *guard = Some(
                listed
                    .into_iter()
                    .map(|bucket| (bucket.name.clone(), bucket))
                    .collect(),
            );
        }
        f(guard.get_or_insert_with(BTreeMap::new))
    }

    /// Resolve a bucket by name, fetching it from the store on a cache miss
    pub fn bucket(&self, name: &str) -> Result<BucketInfo> {
        self.with_bucket_cache(|cache| {
            if let Some(bucket) = cache.get(name) {
                return Ok(bucket.clone());
            }
            let bucket = self.store.get_bucket(name)?;
            debug!(bucket = name, "bucket cache miss resolved");
            cache.insert(name.to_string(), bucket.clone());
            Ok(bucket)
        })
    }

    /// Every bucket in the cache
    pub fn buckets(&self) -> Result<Vec<BucketInfo>> {
        self.with_bucket_cache(|cache| Ok(cache.values().cloned().collect()))
    }

    /// Resolve the object at `path`
    ///
    /// With `validate == false` a missing object yields a placeholder bound to
    /// the key, usable as a create target.
    pub fn object(&self, path: &str, validate: bool) -> Result<Option<ObjectInfo>> {
        let address = self.scheme.parse(path)?;
        let bucket = self.bucket(address.bucket())?;
        let object = self.store.get_object(&bucket.name, address.key())?;
        Ok(match object {
            None if !validate => Some(ObjectInfo::placeholder(bucket.name, address.key())),
            found => found,
        })
    }

    /// Stat without normalization; `None` when nothing lives at `path`
    fn lookup(&self, path: &str) -> Result<Option<ObjectStat>> {
        if self.scheme.is_root(path) {
            return Ok(Some(ObjectStat::for_root(
                &self.scheme,
                &self.config.root_label,
            )));
        }

        let address = self.scheme.parse(path)?;
        let bucket = match self.bucket(address.bucket()) {
            Ok(bucket) => bucket,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        if address.is_bucket_root() {
            return Ok(Some(ObjectStat::from_bucket(&self.scheme, &bucket)));
        }

        let object = self
            .store
            .get_object(&bucket.name, address.key())?
            .unwrap_or_else(|| ObjectInfo::placeholder(bucket.name.as_str(), address.key()));
        self.stat_object(object)
    }

    /// A real object is stat'ed directly; a placeholder is a directory only
    /// if at least one key lives below it
    fn stat_object(&self, object: ObjectInfo) -> Result<Option<ObjectStat>> {
        if !object.is_placeholder() {
            return Ok(Some(ObjectStat::from_object(&self.scheme, &object, false)));
        }

        let prefix = with_separator(&object.key);
        let probe = self.store.list_objects(
            &object.bucket,
            &ListQuery::recursive(prefix.as_str()).max_results(1),
        )?;
        if probe.is_empty() {
            return Ok(None);
        }
        let directory = ObjectInfo::placeholder(object.bucket, prefix);
        Ok(Some(ObjectStat::from_object(&self.scheme, &directory, true)))
    }

    /// Stat a path
    ///
    /// # Errors
    /// `FsError::NotFound` when neither an object nor a directory exists.
    pub fn stat(&self, path: &str) -> Result<ObjectStat> {
        let path = self.scheme.normpath(path);
        self.lookup(&path)?
            .ok_or_else(|| FsError::NotFound(format!("'{}'", path)))
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.is_some())
    }

    pub fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.is_some_and(|stat| !stat.is_dir))
    }

    pub fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.is_some_and(|stat| stat.is_dir))
    }

    /// Stat every immediate child of `path`
    ///
    /// The store root lists buckets. Glob filtering is not available.
    pub fn list_dir_stats(&self, path: &str, glob: Option<&str>) -> Result<Vec<ObjectStat>> {
        if let Some(pattern) = glob {
            return Err(FsError::NotImplemented(format!(
                "Option `glob` is not implemented (got '{}')",
                pattern
            )));
        }

        if self.scheme.is_root(path) {
            return Ok(self
                .buckets()?
                .iter()
                .map(|bucket| ObjectStat::from_bucket(&self.scheme, bucket))
                .collect());
        }

        let address = self.scheme.parse(path)?;
        let bucket = self.bucket(address.bucket())?;
        let prefix = with_separator(address.key());
        let entries = self
            .store
            .list_objects(&bucket.name, &ListQuery::hierarchical(prefix.as_str()))?;

        Ok(entries
            .iter()
            .filter(|entry| !matches!(entry, StoreEntry::Object(object) if object.key == prefix))
            .map(|entry| ObjectStat::from_entry(&self.scheme, entry))
            .collect())
    }

    /// Names of the immediate children of `path`
    pub fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .list_dir_stats(path, None)?
            .into_iter()
            .map(|stat| stat.name)
            .collect())
    }

    /// Open `path`; anything but [`OpenMode::Read`] fails with
    /// `FsError::InvalidArgument`
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<ObjectReader> {
        let object = self
            .object(path, true)?
            .ok_or_else(|| FsError::NotFound(format!("'{}'", path)))?;
        ObjectReader::open(&self.store, object, mode)
    }

    /// Read `length` bytes of `path` starting at `offset`
    pub fn read(&self, path: &str, offset: u64, length: usize) -> Result<Bytes> {
        let mut reader = self.open(path, OpenMode::Read)?;
        reader.seek(SeekFrom::Start(offset))?;
        Ok(reader.read_bytes(length))
    }

    /// Read one configured chunk of `path` starting at `offset`
    pub fn read_chunk(&self, path: &str, offset: u64) -> Result<Bytes> {
        let length = usize::try_from(self.config.read_chunk_size).unwrap_or(usize::MAX);
        self.read(path, offset, length)
    }

    /// Create a directory
    ///
    /// Writes an empty `key/` marker object. Idempotent for existing
    /// directories.
    pub fn mkdir(&self, path: &str) -> Result<()> {
        match self.lookup(path)? {
            Some(stat) if stat.is_dir => {
                debug!(path, "directory already exists");
                Ok(())
            }
            Some(_) => Err(FsError::NotADirectory(format!(
                "'{}' already exists and is not a directory",
                path
            ))),
            None => {
                let address = self.scheme.parse(path)?;
                self.bucket(address.bucket())?;
                self.create(&with_separator(path), false, Bytes::new())
            }
        }
    }

    /// Write `data` to `path` when `overwrite` is set or nothing exists there
    pub fn create(&self, path: &str, overwrite: bool, data: impl Into<Bytes>) -> Result<()> {
        let address = self.scheme.parse(path)?;
        if address.is_bucket_root() {
            return Err(FsError::InvalidArgument(format!(
                "Cannot create an object at bucket root '{}'",
                path
            )));
        }
        let bucket = self.bucket(address.bucket())?;

        if !overwrite
            && self
                .store
                .get_object(&bucket.name, address.key())?
                .is_some()
        {
            debug!(path, "object exists, keeping it");
            return Ok(());
        }

        let object = self
            .store
            .upload_bytes(&bucket.name, address.key(), data.into())?;
        debug!(path, size = ?object.size, "created object");
        Ok(())
    }

    /// Copy `src` to `dst`
    ///
    /// Directories are only copied with `recursive`; otherwise they are
    /// skipped without error. When `dst` is an existing directory the source
    /// keeps its name inside it.
    pub fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<()> {
        self.copy_tree(src, dst, recursive, true)
    }

    /// Copy a single file to exactly `dst`, which must not be a directory
    pub fn copy_file(&self, src: &str, dst: &str) -> Result<()> {
        let target = self.resolve_destination(src, dst);
        if self.is_dir(&target)? {
            return Err(FsError::InvalidArgument(format!(
                "Copy dst '{}' is a directory",
                dst
            )));
        }
        self.copy_tree(src, dst, false, false)
    }

    /// Copy the contents of directory `src` into `dst`
    pub fn copy_remote_dir(&self, src: &str, dst: &str) -> Result<()> {
        self.copy_tree(src, dst, true, false)
    }

    /// Full addresses stand as given; relative ones are siblings of `src`
    fn resolve_destination(&self, src: &str, dst: &str) -> String {
        self.scheme.abspath(&self.scheme.parent(src), dst)
    }

    fn copy_tree(&self, src: &str, dst: &str, recursive: bool, use_src_basename: bool) -> Result<()> {
        let src = self.scheme.normpath(src);
        let src_stat = self.stat(&src)?;
        if src_stat.is_dir && !recursive {
            debug!(src = %src, "omitting directory in non-recursive copy");
            return Ok(());
        }

        let dst = self.resolve_destination(&src, dst);
        let dst_is_dir = self.lookup(&dst)?.map(|stat| stat.is_dir);
        if src_stat.is_dir && dst_is_dir == Some(false) {
            return Err(FsError::FileExists(format!(
                "Cannot overwrite non-directory '{}' with directory '{}'",
                dst, src
            )));
        }

        let src_address = self.scheme.parse(&src)?;
        let dst_address = self.scheme.parse(&dst)?;
        let src_bucket = self.bucket(src_address.bucket())?;
        let dst_bucket = self.bucket(dst_address.bucket())?;
        let src_key = src_address.key();

        let keep_src_basename = use_src_basename && dst_is_dir == Some(true);
        let cut = if keep_src_basename {
            src_key.rfind('/').map_or(0, |idx| idx + 1)
        } else if src_key.is_empty() {
            0
        } else {
            src_key.len() + 1
        };

        let (prefix, sources) = if src_stat.is_dir {
            let prefix = with_separator(src_key);
            let keys = self
                .store
                .list_objects(&src_bucket.name, &ListQuery::recursive(prefix.as_str()))?
                .into_iter()
                .filter_map(|entry| match entry {
                    StoreEntry::Object(object) => Some(object.key),
                    _ => None,
                })
                .collect::<Vec<_>>();
            (prefix, keys)
        } else {
            (src_key.to_string(), vec![src_key.to_string()])
        };

        if let Some(stray) = sources.iter().find(|key| !key.starts_with(prefix.as_str())) {
            return Err(FsError::Invariant(format!(
                "Invalid blob to transform: {}",
                stray
            )));
        }

        let mut copied = 0usize;
        for key in sources {
            let relative = key.get(cut..).unwrap_or_default();
            let mut dst_key = join_key(dst_address.key(), relative);
            if dst_key.is_empty() {
                warn!(key = %key, dst = %dst, "skipping copy onto bucket root");
                continue;
            }
            if key.ends_with('/') {
                dst_key.push('/');
            }

            trace!(src_key = %key, dst_key = %dst_key, "copying object");
            self.store
                .copy_object(&src_bucket.name, &key, &dst_bucket.name, &dst_key)?;
            copied += 1;
        }

        debug!(src = %src, dst = %dst, copied, "copy finished");
        Ok(())
    }

    /// Rename a single object; no tree walk
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old_address = self.scheme.parse(old)?;
        let new_address = self.scheme.parse(new)?;
        if old_address.is_bucket_root() || new_address.is_bucket_root() {
            return Err(FsError::InvalidArgument(format!(
                "Cannot rename bucket root: '{}' -> '{}'",
                old, new
            )));
        }

        let old_bucket = self.bucket(old_address.bucket())?;
        let new_bucket = self.bucket(new_address.bucket())?;
        debug!(old, new, "renaming object");

        if old_bucket.name == new_bucket.name {
            self.store
                .rename_object(&old_bucket.name, old_address.key(), new_address.key())
        } else {
            self.store.copy_object(
                &old_bucket.name,
                old_address.key(),
                &new_bucket.name,
                new_address.key(),
            )?;
            self.store
                .delete_object(&old_bucket.name, old_address.key())
        }
    }

    /// Move the immediate children of `old_dir` under `new_dir`
    ///
    /// Files are renamed; child directories only have their marker object
    /// moved, their contents stay where they are.
    ///
    /// # Errors
    /// `FsError::NotFound` for a child directory without a marker object.
    /// Children renamed before it stay renamed.
    pub fn rename_tree(&self, old_dir: &str, new_dir: &str) -> Result<()> {
        if !self.is_dir(old_dir)? {
            return Err(FsError::NotADirectory(format!(
                "'{}' is not a directory",
                old_dir
            )));
        }
        if self.is_file(new_dir)? {
            return Err(FsError::NotADirectory(format!(
                "'{}' is not a directory",
                new_dir
            )));
        }

        for child in self.list_dir_stats(old_dir, None)? {
            let source = self.scheme.join([old_dir, child.name.as_str()]);
            let target = self.scheme.join([new_dir, child.name.as_str()]);
            if !child.is_dir {
                self.rename(&source, &target)?;
                continue;
            }

            let marker = with_separator(&source);
            if self.object(&marker, true)?.is_some() {
                self.rename(&marker, &with_separator(&target))?;
            } else {
                // a prefix-only directory has no object to move; the store
                // reports that as NotFound
                self.rename(&source, &target)?;
            }
        }
        Ok(())
    }

    /// Delete one object
    ///
    /// # Errors
    /// `FsError::NotImplemented` unless `skip_trash` is set.
    pub fn remove(&self, path: &str, skip_trash: bool) -> Result<()> {
        if !skip_trash {
            return Err(FsError::NotImplemented(TRASH_UNSUPPORTED.to_string()));
        }
        let address = self.scheme.parse(path)?;
        let bucket = self.bucket(address.bucket())?;
        debug!(path, "removing object");
        self.store.delete_object(&bucket.name, address.key())
    }

    /// Delete `path` and everything below it in one batch
    ///
    /// # Errors
    /// `FsError::NotImplemented` unless `skip_trash` is set;
    /// `FsError::AggregateDelete` listing every key the store failed to
    /// delete (the others are gone).
    pub fn rmtree(&self, path: &str, skip_trash: bool) -> Result<()> {
        if !skip_trash {
            return Err(FsError::NotImplemented(TRASH_UNSUPPORTED.to_string()));
        }

        let address = self.scheme.parse(path)?;
        let bucket = self.bucket(address.bucket())?;
        let key = address.key();

        let mut keys = Vec::new();
        if self.is_dir(path)? {
            // the separator keeps `gs://b/a` from matching `gs://b/a_new`
            let prefix = with_separator(key);
            keys.extend(
                self.store
                    .list_objects(&bucket.name, &ListQuery::recursive(prefix.as_str()))?
                    .into_iter()
                    .filter_map(|entry| match entry {
                        StoreEntry::Object(object) => Some(object.key),
                        _ => None,
                    }),
            );
        }
        if !key.is_empty()
            && !keys.iter().any(|k| k == key)
            && self.store.get_object(&bucket.name, key)?.is_some()
        {
            keys.push(key.to_string());
        }

        if keys.is_empty() {
            debug!(path, "nothing to delete");
            return Ok(());
        }

        let report = self.store.delete_objects(&bucket.name, &keys)?;
        if report.failed.is_empty() {
            debug!(path, deleted = report.deleted.len(), "removed tree");
            return Ok(());
        }

        let err = FsError::AggregateDelete {
            path: path.to_string(),
            failures: report
                .failed
                .into_iter()
                .map(|(key, reason)| DeleteFailure { key, reason })
                .collect(),
        };
        error!(error = %err, "batched delete failed");
        Err(err)
    }

    /// Trash is not available, so nothing can be restored
    pub fn restore(&self, path: &str) -> Result<()> {
        Err(FsError::NotImplemented(format!(
            "{} (restore '{}')",
            TRASH_UNSUPPORTED, path
        )))
    }

    /// Parse `path` against this filesystem's scheme
    pub fn parse(&self, path: &str) -> Result<Address> {
        self.scheme.parse(path)
    }
}

/// Join a relative key onto a base key and normalize the result
fn join_key(base: &str, relative: &str) -> String {
    normalize_key(&format!("{}/{}", base, relative))
}
