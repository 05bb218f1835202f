//! Tokio runtime management for synchronous operations

use crate::{CloudError, Result};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Runtime;

/// Get or create a shared Tokio runtime for blocking operations
pub(crate) fn get_runtime() -> Result<Arc<Runtime>> {
    static RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("blobfs-cloud-worker")
        .build()
        .map_err(|e| CloudError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    // a concurrent caller may have won the race; its runtime is kept
    Ok(RUNTIME.get_or_init(|| Arc::new(runtime)).clone())
}
