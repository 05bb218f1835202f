//! Common test fixtures for blobfs testing

use crate::TestDir;
use anyhow::Result;
use blobfs_core::{BlobFileSystem, MemoryStore, StoreClient};
use bytes::Bytes;
use std::sync::Arc;

/// Bucket used by [`seeded_store`]
pub const TEST_BUCKET: &str = "test-bucket";

/// Objects written by [`seeded_store`]
///
/// `docs/` has a marker, `logs/` only exists as a prefix, and `docs.bak`
/// shares a string prefix with `docs` without being inside it.
pub const SAMPLE_OBJECTS: &[(&str, &[u8])] = &[
    ("docs/", b""),
    ("docs/readme.md", b"# Readme"),
    ("docs/guide/intro.txt", b"Welcome aboard."),
    ("docs.bak", b"old docs"),
    ("logs/2024/app.log", b"started\nstopped\n"),
    ("top.txt", b"top level file"),
];

/// Upload `objects` into `bucket` of `store`
pub fn seed_objects(store: &dyn StoreClient, bucket: &str, objects: &[(&str, &[u8])]) -> Result<()> {
    for (key, data) in objects {
        store.upload_bytes(bucket, key, Bytes::copy_from_slice(data))?;
    }
    Ok(())
}

/// An in-memory store holding [`SAMPLE_OBJECTS`] in [`TEST_BUCKET`] plus an
/// empty `other-bucket`
pub fn seeded_store() -> Result<Arc<MemoryStore>> {
    let store = Arc::new(MemoryStore::with_buckets([TEST_BUCKET, "other-bucket"]));
    seed_objects(store.as_ref(), TEST_BUCKET, SAMPLE_OBJECTS)?;
    Ok(store)
}

/// A default-configured filesystem over `store`
pub fn filesystem(store: Arc<MemoryStore>) -> BlobFileSystem {
    BlobFileSystem::with_defaults(store)
}

/// Creates a standard local tree for upload tests
pub fn create_local_tree(test_dir: &TestDir) -> Result<()> {
    test_dir.create_file("file1.txt", b"This is file 1 content.")?;
    test_dir.create_file("subdir/file2.txt", b"This is file 2 in subdir.")?;
    test_dir.create_file("subdir/deeper/file3.bin", &[0xFF, 0xD8, 0xFF, 0xE0])?;
    test_dir.create_dir("empty")?;
    Ok(())
}

/// Adds a file symlink and a directory symlink next to the standard tree
/// (Unix only)
#[cfg(unix)]
pub fn create_symlink(test_dir: &TestDir) -> Result<()> {
    use std::os::unix::fs::symlink;

    symlink(
        test_dir.path().join("file1.txt"),
        test_dir.path().join("link_to_file1.txt"),
    )?;
    symlink(
        test_dir.path().join("subdir"),
        test_dir.path().join("link_to_subdir"),
    )?;
    Ok(())
}
