//! Backend factory
//!
//! Resolves the configured backend type name to a concrete
//! [`CheckpointBackend`]. An unrecognized name is a fatal configuration
//! error raised here, at construction time, never deferred to first use.

use object_store::local::LocalFileSystem;
use std::fs;
use std::sync::Arc;
use tracing::info;

use super::{CheckpointBackend, FileCheckpointStore, MemoryCheckpointStore, ObjectCheckpointStore};
use crate::config::CheckpointConfig;
use crate::error::{CheckpointerError, Result};

/// Create a checkpoint backend from the configured backend type
///
/// Recognized names:
///
/// - `"blob"`: object storage rooted at `data_dir`, keys under `blob_prefix`
/// - `"file"`: one JSON document per partition under `data_dir`
/// - `"memory"`: in-process map, nothing persisted
pub fn create_backend(config: &CheckpointConfig) -> Result<Arc<dyn CheckpointBackend>> {
    match config.backend.as_str() {
        "blob" => {
            fs::create_dir_all(&config.data_dir)?;
            let store = Arc::new(LocalFileSystem::new_with_prefix(&config.data_dir)?);
            info!(backend = "blob", data_dir = %config.data_dir.display(), "checkpoint backend created");
            Ok(Arc::new(ObjectCheckpointStore::new(
                store,
                config.blob_prefix.clone(),
            )))
        }
        "file" => {
            info!(backend = "file", data_dir = %config.data_dir.display(), "checkpoint backend created");
            Ok(Arc::new(FileCheckpointStore::new(&config.data_dir)?))
        }
        "memory" => {
            info!(backend = "memory", "checkpoint backend created");
            Ok(Arc::new(MemoryCheckpointStore::new()))
        }
        other => Err(CheckpointerError::Config(format!(
            "unknown checkpoint backend type: {other}"
        ))),
    }
}
