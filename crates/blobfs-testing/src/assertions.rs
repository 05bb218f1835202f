//! Common assertions for blobfs testing

use anyhow::{Context, Result};
use blobfs_core::{FsError, MemoryStore, StoreClient};
use std::fmt::Debug;
use std::path::Path;
use walkdir::WalkDir;

/// Asserts that `bucket` holds exactly `expected` keys
pub fn assert_keys(store: &MemoryStore, bucket: &str, expected: &[&str]) {
    let mut expected: Vec<String> = expected.iter().map(|k| k.to_string()).collect();
    expected.sort();
    assert_eq!(store.keys(bucket), expected, "Key set mismatch in '{}'", bucket);
}

/// Asserts that an object exists with the given body
pub fn assert_object_content(
    store: &dyn StoreClient,
    bucket: &str,
    key: &str,
    expected: &[u8],
) -> Result<()> {
    let object = store
        .get_object(bucket, key)?
        .with_context(|| format!("Object '{}' missing from '{}'", key, bucket))?;
    let data = store.download(&object)?;
    assert_eq!(data.as_ref(), expected, "Content mismatch for '{}'", key);
    Ok(())
}

/// Asserts that a result failed with `FsError::NotFound`
pub fn assert_not_found<T: Debug>(result: blobfs_core::Result<T>) {
    match result {
        Err(FsError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

/// Asserts that every regular file below `local_dir` was uploaded under
/// `prefix` with identical content
pub fn assert_tree_uploaded(
    local_dir: &Path,
    store: &dyn StoreClient,
    bucket: &str,
    prefix: &str,
) -> Result<usize> {
    let mut checked = 0;
    for entry in WalkDir::new(local_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(local_dir)?;
        let relative: Vec<String> = relative
            .iter()
            .map(|c| c.to_string_lossy().into_owned())
            .collect();
        let key = format!("{}/{}", prefix, relative.join("/"));
        let content = std::fs::read(entry.path())?;
        assert_object_content(store, bucket, &key, &content)?;
        checked += 1;
    }
    Ok(checked)
}
