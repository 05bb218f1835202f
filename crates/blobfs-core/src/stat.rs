//! Filesystem metadata for buckets, objects and prefixes

use crate::client::{BucketInfo, ObjectInfo, StoreEntry};
use crate::uri::Scheme;
use serde::Serialize;
use std::fmt;

/// `S_IFDIR | 0o777`
pub const DIR_MODE: u32 = 0o040_000 | 0o777;
/// `S_IFREG | 0o666`
pub const FILE_MODE: u32 = 0o100_000 | 0o666;

/// File or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileKind {
    File,
    Directory,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => f.write_str("FILE"),
            FileKind::Directory => f.write_str("DIRECTORY"),
        }
    }
}

/// Stat information for one path in the store
///
/// Only name, path, type, size and mtime are stored; everything else is
/// derived because object stores have no POSIX identity or access times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    /// Last path segment
    pub name: String,
    /// Full address
    pub path: String,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Size in bytes, 0 for directories
    pub size: u64,
    /// Modification time (Unix timestamp)
    pub mtime: i64,
}

/// Flat serialization of an [`ObjectStat`], fields in wire order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRecord {
    pub path: String,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub mode: u32,
    pub user: String,
    pub group: String,
    #[serde(rename = "aclBit")]
    pub acl_bit: bool,
}

impl ObjectStat {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        is_dir: bool,
        size: u64,
        mtime: i64,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir,
            size,
            mtime,
        }
    }

    pub fn kind(&self) -> FileKind {
        if self.is_dir {
            FileKind::Directory
        } else {
            FileKind::File
        }
    }

    pub fn mode(&self) -> u32 {
        if self.is_dir {
            DIR_MODE
        } else {
            FILE_MODE
        }
    }

    pub fn user(&self) -> &str {
        ""
    }

    pub fn group(&self) -> &str {
        ""
    }

    /// Stores keep no access time; this is the modification time
    pub fn atime(&self) -> i64 {
        self.mtime
    }

    pub fn acl_bit(&self) -> bool {
        false
    }

    /// Stat for a bucket
    pub fn from_bucket(scheme: &Scheme, bucket: &BucketInfo) -> Self {
        let path = scheme.address(bucket.name.as_str(), "").to_string();
        Self::new(bucket.name.as_str(), path, true, 0, 0)
    }

    /// Stat for an object or placeholder
    ///
    /// An object with a known size is a directory only when its key is empty
    /// or ends in `/`. A placeholder has no size, so the caller decides via
    /// `dir_hint` after probing for children.
    pub fn from_object(scheme: &Scheme, object: &ObjectInfo, dir_hint: bool) -> Self {
        let is_dir = match object.size {
            Some(_) => object.key.is_empty() || object.key.ends_with('/'),
            None => dir_hint,
        };

        let address = scheme.address(object.bucket.as_str(), object.key.as_str());
        let mtime = object.updated.map(|t| t.timestamp()).unwrap_or(0);
        Self::new(
            address.basename(),
            address.to_string(),
            is_dir,
            object.size.unwrap_or(0),
            mtime,
        )
    }

    /// Stat for a common prefix (always a directory)
    pub fn from_prefix(scheme: &Scheme, bucket: &str, prefix: &str) -> Self {
        let address = scheme.address(bucket, prefix);
        Self::new(address.basename(), address.to_string(), true, 0, 0)
    }

    /// Stat for any listing entry
    pub fn from_entry(scheme: &Scheme, entry: &StoreEntry) -> Self {
        match entry {
            StoreEntry::Bucket(bucket) => Self::from_bucket(scheme, bucket),
            StoreEntry::Object(object) => Self::from_object(scheme, object, false),
            StoreEntry::CommonPrefix { bucket, prefix } => Self::from_prefix(scheme, bucket, prefix),
        }
    }

    /// Synthetic stat for the store root
    pub fn for_root(scheme: &Scheme, label: &str) -> Self {
        Self::new(label, scheme.root(), true, 0, 0)
    }

    /// The flat record consumed by JSON front ends
    pub fn to_record(&self) -> StatRecord {
        StatRecord {
            path: self.path.clone(),
            size: self.size,
            atime: self.atime(),
            mtime: self.mtime,
            mode: self.mode(),
            user: self.user().to_string(),
            group: self.group().to_string(),
            acl_bit: self.acl_bit(),
        }
    }

    /// JSON text of [`ObjectStat::to_record`], keys in wire order
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn gs() -> Scheme {
        Scheme::new("gs")
    }

    #[test]
    fn test_derivable_properties() {
        let s = ObjectStat::new("foo", "gs://bar/foo", false, 40, 1424983327);
        assert_eq!(s.kind(), FileKind::File);
        assert_eq!(s.mode(), 0o666 | 0o100_000);
        assert_eq!(s.user(), "");
        assert_eq!(s.group(), "");
        assert_eq!(s.atime(), 1424983327);
        assert!(!s.acl_bit());

        let s = ObjectStat::new("bar", "gs://bar", true, 0, 1424983327);
        assert_eq!(s.kind(), FileKind::Directory);
        assert_eq!(s.mode(), 0o777 | 0o040_000);
    }

    #[test]
    fn test_from_bucket() {
        let s = ObjectStat::from_bucket(&gs(), &BucketInfo::new("boo"));
        assert_eq!(s.kind(), FileKind::Directory);
        assert_eq!(s.name, "boo");
        assert_eq!(s.path, "gs://boo");
        assert_eq!(s.size, 0);
        assert_eq!(s.atime(), 0);
    }

    #[test]
    fn test_from_object() {
        let updated = Utc.with_ymd_and_hms(2015, 2, 26, 20, 42, 7).unwrap();
        let object = ObjectInfo {
            bucket: "bar".into(),
            key: "foo".into(),
            size: Some(42),
            updated: Some(updated),
        };
        let s = ObjectStat::from_object(&gs(), &object, false);
        assert_eq!(s.kind(), FileKind::File);
        assert_eq!(s.name, "foo");
        assert_eq!(s.path, "gs://bar/foo");
        assert_eq!(s.size, 42);
        assert_eq!(s.mtime, 1424983327);

        let placeholder = ObjectInfo::placeholder("bar", "foo");
        let s = ObjectStat::from_object(&gs(), &placeholder, true);
        assert_eq!(s.kind(), FileKind::Directory);
        assert_eq!(s.size, 0);
        assert_eq!(s.atime(), 0);
    }

    #[test]
    fn test_from_object_marker_is_directory() {
        let marker = ObjectInfo {
            bucket: "bar".into(),
            key: "dir/sub/".into(),
            size: Some(0),
            updated: None,
        };
        let s = ObjectStat::from_object(&gs(), &marker, false);
        assert!(s.is_dir);
        assert_eq!(s.name, "sub");
        assert_eq!(s.path, "gs://bar/dir/sub/");

        let bucket_root = ObjectInfo {
            bucket: "bar".into(),
            key: String::new(),
            size: Some(0),
            updated: None,
        };
        let s = ObjectStat::from_object(&gs(), &bucket_root, false);
        assert!(s.is_dir);
        assert_eq!(s.name, "");
        assert_eq!(s.path, "gs://bar");
    }

    #[test]
    fn test_from_entry_prefix() {
        let entry = StoreEntry::CommonPrefix {
            bucket: "b".into(),
            prefix: "a/c/".into(),
        };
        let s = ObjectStat::from_entry(&gs(), &entry);
        assert!(s.is_dir);
        assert_eq!(s.name, "c");
        assert_eq!(s.path, "gs://b/a/c/");
    }

    #[test]
    fn test_for_root() {
        let s = ObjectStat::for_root(&gs(), "GCS");
        assert_eq!(s.kind(), FileKind::Directory);
        assert_eq!(s.name, "GCS");
        assert_eq!(s.path, "gs://");
        assert_eq!(s.size, 0);
        assert_eq!(s.atime(), 0);
    }

    #[test]
    fn test_json_field_order() {
        let s = ObjectStat::new("foo", "gs://bar/foo", false, 40, 7);
        let json = s.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"path":"gs://bar/foo","size":40,"atime":7,"mtime":7,"mode":33206,"user":"","group":"","aclBit":false}"#
        );
    }
}
