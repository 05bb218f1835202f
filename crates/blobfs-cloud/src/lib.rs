//! # blobfs-cloud
//!
//! Cloud storage client for blobfs. This crate implements the blocking
//! `StoreClient` trait from `blobfs-core` on top of `object_store`, so a
//! `BlobFileSystem` can run against Google Cloud Storage, S3, Azure or
//! in-memory buckets without dealing with async code.
//!
//! ## Architecture
//!
//! - `CloudStoreClient`: one `ObjectStore` per bucket, async calls driven on a
//!   shared Tokio runtime
//! - `CloudConfig`: provider selection, visible buckets and credentials

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod config;
mod error;
mod runtime;
mod store;

pub use config::{parse_bucket_list, CloudConfig, Provider};
pub use error::{CloudError, Result};
pub use store::{CloudStoreClient, MARKER_FILE};

// Re-export commonly used types from object_store
pub use object_store::{memory::InMemory, path::Path as ObjectPath, ObjectStore};
