use blobfs_core::{BlobFileSystem, FileKind, FsConfig, FsError, MemoryStore, OpenMode};
use blobfs_testing::assertions::{assert_keys, assert_not_found, assert_object_content};
use blobfs_testing::fixtures::{filesystem, seeded_store, TEST_BUCKET};
use blobfs_testing::helpers::init_tracing;
use std::io::Read;
use std::sync::Arc;

fn bucket_path(key: &str) -> String {
    format!("gs://{}/{}", TEST_BUCKET, key)
}

#[test]
fn test_create_stat_list_remove() {
    init_tracing();
    let store = Arc::new(MemoryStore::with_buckets(["b"]));
    let fs = filesystem(store.clone());

    fs.create("gs://b/f.txt", false, "hello").unwrap();

    let stat = fs.stat("gs://b/f.txt").unwrap();
    assert_eq!(stat.kind(), FileKind::File);
    assert_eq!(stat.name, "f.txt");
    assert_eq!(stat.path, "gs://b/f.txt");
    assert_eq!(stat.size, 5);
    assert!(stat.mtime > 0);

    assert_eq!(fs.list_dir("gs://b").unwrap(), ["f.txt"]);
    assert_eq!(fs.read("gs://b/f.txt", 0, 1024).unwrap(), "hello".as_bytes());

    fs.remove("gs://b/f.txt", true).unwrap();
    assert!(!fs.exists("gs://b/f.txt").unwrap());
    assert!(fs.exists("gs://b").unwrap());
    assert_keys(&store, "b", &[]);
}

#[test]
fn test_stat_root_and_buckets() {
    let fs = filesystem(seeded_store().unwrap());

    let root = fs.stat("gs://").unwrap();
    assert!(root.is_dir);
    assert_eq!(root.name, "GCS");
    assert_eq!(root.path, "gs://");

    let bucket = fs.stat(&format!("gs://{}", TEST_BUCKET)).unwrap();
    assert!(bucket.is_dir);
    assert_eq!(bucket.name, TEST_BUCKET);
    assert_eq!(bucket.size, 0);

    // an empty bucket is still a directory
    assert!(fs.is_dir("gs://other-bucket").unwrap());
    assert!(fs.is_dir("gs://other-bucket/").unwrap());

    assert_not_found(fs.stat("gs://missing-bucket"));
    assert!(!fs.exists("gs://missing-bucket/key").unwrap());
}

#[test]
fn test_stat_objects_and_directories() {
    let fs = filesystem(seeded_store().unwrap());

    let docs = fs.stat(&bucket_path("docs")).unwrap();
    assert!(docs.is_dir);
    assert_eq!(docs.name, "docs");

    // no marker object, only keys below it
    let logs = fs.stat(&bucket_path("logs")).unwrap();
    assert!(logs.is_dir);
    assert_eq!(logs.path, bucket_path("logs/"));
    assert!(fs.is_dir(&bucket_path("logs/2024/")).unwrap());

    assert!(fs.is_file(&bucket_path("top.txt")).unwrap());
    assert!(!fs.is_dir(&bucket_path("top.txt")).unwrap());
    assert!(fs.is_file(&bucket_path("docs.bak")).unwrap());

    assert!(!fs.exists(&bucket_path("nope")).unwrap());
    assert!(!fs.is_file(&bucket_path("nope")).unwrap());
    assert_not_found(fs.stat(&bucket_path("nope")));
}

#[test]
fn test_stat_normalizes_path() {
    let fs = filesystem(seeded_store().unwrap());
    let stat = fs.stat(&bucket_path("docs/guide/../readme.md")).unwrap();
    assert_eq!(stat.path, bucket_path("docs/readme.md"));
    assert_eq!(stat.size, 8);
}

#[test]
fn test_stat_record_json() {
    let fs = filesystem(seeded_store().unwrap());
    let json = fs.stat(&bucket_path("top.txt")).unwrap().to_json().unwrap();
    assert!(json.starts_with(&format!("{{\"path\":\"{}\",\"size\":14,", bucket_path("top.txt"))));
    assert!(json.contains("\"mode\":33206"));
    assert!(json.ends_with("\"user\":\"\",\"group\":\"\",\"aclBit\":false}"));
}

#[test]
fn test_list_dir() {
    let fs = filesystem(seeded_store().unwrap());

    assert_eq!(fs.list_dir("gs://").unwrap(), ["other-bucket", TEST_BUCKET]);
    assert_eq!(
        fs.list_dir(&format!("gs://{}", TEST_BUCKET)).unwrap(),
        ["docs.bak", "docs", "logs", "top.txt"]
    );
    assert_eq!(fs.list_dir(&bucket_path("docs")).unwrap(), ["guide", "readme.md"]);
    assert_eq!(fs.list_dir(&bucket_path("docs/")).unwrap(), ["guide", "readme.md"]);
    assert!(fs.list_dir("gs://other-bucket").unwrap().is_empty());

    let stats = fs.list_dir_stats(&bucket_path("docs"), None).unwrap();
    assert!(stats[0].is_dir);
    assert_eq!(stats[0].path, bucket_path("docs/guide/"));
    assert!(!stats[1].is_dir);
    assert_eq!(stats[1].size, 8);
}

#[test]
fn test_list_dir_glob_not_implemented() {
    let fs = filesystem(seeded_store().unwrap());
    let result = fs.list_dir_stats(&bucket_path("docs"), Some("*.md"));
    assert!(matches!(result, Err(FsError::NotImplemented(_))));
}

#[test]
fn test_mkdir_is_idempotent() {
    let store = seeded_store().unwrap();
    let fs = filesystem(store.clone());

    fs.mkdir(&bucket_path("new")).unwrap();
    let keys = store.keys(TEST_BUCKET);
    assert!(keys.contains(&"new/".to_string()));

    fs.mkdir(&bucket_path("new")).unwrap();
    fs.mkdir(&bucket_path("new/")).unwrap();
    fs.mkdir(&bucket_path("logs")).unwrap();
    assert_eq!(store.keys(TEST_BUCKET), keys);
    assert!(fs.is_dir(&bucket_path("new")).unwrap());
    assert!(fs.list_dir(&bucket_path("new")).unwrap().is_empty());
}

#[test]
fn test_mkdir_over_file_fails() {
    let fs = filesystem(seeded_store().unwrap());
    let result = fs.mkdir(&bucket_path("top.txt"));
    assert!(matches!(result, Err(FsError::NotADirectory(_))));
}

#[test]
fn test_mkdir_in_missing_bucket_fails() {
    let fs = filesystem(seeded_store().unwrap());
    assert_not_found(fs.mkdir("gs://missing-bucket/dir"));
    assert_not_found(fs.mkdir("gs://missing-bucket"));
}

#[test]
fn test_create_respects_overwrite() {
    let store = seeded_store().unwrap();
    let fs = filesystem(store.clone());

    fs.create(&bucket_path("top.txt"), false, "changed").unwrap();
    assert_object_content(store.as_ref(), TEST_BUCKET, "top.txt", b"top level file").unwrap();

    fs.create(&bucket_path("top.txt"), true, "changed").unwrap();
    assert_object_content(store.as_ref(), TEST_BUCKET, "top.txt", b"changed").unwrap();

    fs.create(&bucket_path("empty.txt"), false, Vec::<u8>::new()).unwrap();
    assert_eq!(fs.stat(&bucket_path("empty.txt")).unwrap().size, 0);

    let result = fs.create(&format!("gs://{}", TEST_BUCKET), true, "x");
    assert!(matches!(result, Err(FsError::InvalidArgument(_))));
}

#[test]
fn test_open_and_read() {
    let fs = filesystem(seeded_store().unwrap());
    let path = bucket_path("docs/readme.md");

    let mut reader = fs.open(&path, OpenMode::Read).unwrap();
    assert_eq!(reader.size(), 8);
    let mut text = String::new();
    reader.read_to_string(&mut text).unwrap();
    assert_eq!(text, "# Readme");

    assert_eq!(fs.read(&path, 2, 3).unwrap(), "Rea".as_bytes());
    assert!(fs.read(&path, 100, 3).unwrap().is_empty());
    assert_eq!(fs.read_chunk(&path, 0).unwrap(), "# Readme".as_bytes());
}

#[test]
fn test_open_rejects_write_modes_and_missing_objects() {
    let fs = filesystem(seeded_store().unwrap());

    let mode: OpenMode = "w".parse().unwrap();
    let result = fs.open(&bucket_path("top.txt"), mode);
    assert!(matches!(result, Err(FsError::InvalidArgument(_))));

    assert_not_found(fs.open(&bucket_path("missing.txt"), OpenMode::Read));
}

#[test]
fn test_read_chunk_uses_configured_size() {
    let store = seeded_store().unwrap();
    let config = FsConfig {
        read_chunk_size: 4,
        ..Default::default()
    };
    let fs = BlobFileSystem::new(store, config);
    assert_eq!(fs.read_chunk(&bucket_path("top.txt"), 0).unwrap(), "top ".as_bytes());
    assert_eq!(fs.read_chunk(&bucket_path("top.txt"), 4).unwrap(), "leve".as_bytes());
}

#[test]
fn test_custom_scheme() {
    let store = seeded_store().unwrap();
    let config = FsConfig::from_toml_str("scheme = \"s3a\"\nroot_label = \"S3\"").unwrap();
    let fs = BlobFileSystem::new(store, config);

    assert_eq!(fs.stat("s3a://").unwrap().name, "S3");
    assert!(fs.is_file(&format!("s3a://{}/top.txt", TEST_BUCKET)).unwrap());
    assert!(matches!(
        fs.stat(&bucket_path("top.txt")),
        Err(FsError::InvalidAddress(_))
    ));
}

#[test]
fn test_path_helpers() {
    let fs = filesystem(seeded_store().unwrap());
    assert!(fs.is_root("gs://"));
    assert_eq!(fs.join(["gs://b", "dir", "f.txt"]), "gs://b/dir/f.txt");
    assert_eq!(fs.normpath("gs://b/dir/../f.txt"), "gs://b/f.txt");
    assert_eq!(fs.parse("gs://b/k").unwrap().key(), "k");
    fs.set_user("hue");
}

#[test]
fn test_filesystem_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BlobFileSystem>();
}
