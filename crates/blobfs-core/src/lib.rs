//! blobfs - A filesystem facade over bucket/blob object stores
//!
//! This library maps `gs://bucket/key` style paths onto an object store and
//! provides filesystem semantics on top: stat, directory listing, reading,
//! mkdir, copy, rename and recursive delete. Directories are emulated with
//! zero-byte `key/` marker objects and key prefixes.

pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod stat;
pub mod stream;
pub mod translate;
pub mod upload;
pub mod uri;

pub use error::{FsError, Result};

// Re-export commonly used types
pub use client::{
    BucketInfo, DeleteReport, ListQuery, ObjectInfo, StoreClient, StoreEntry, StoreError,
    StoreResult,
};
pub use config::FsConfig;
pub use fs::BlobFileSystem;
pub use memory::MemoryStore;
pub use stat::{FileKind, ObjectStat, StatRecord};
pub use stream::{ObjectReader, OpenMode};
pub use translate::TranslatedStore;
pub use uri::{Address, Scheme};
