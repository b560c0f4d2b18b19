//! Object storage checkpoint backend
//!
//! Persists one object per partition under a configurable key prefix,
//! through the [`object_store`] abstraction. Which concrete store backs it
//! (local filesystem, in-memory, or a cloud blob service) is a wiring
//! decision made by the caller; the agent only sees load/store.

use async_trait::async_trait;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

use super::{CheckpointBackend, CheckpointDocument};
use crate::error::{CheckpointerError, Result};
use crate::offset::Offset;

/// Object-storage-backed checkpoint store
#[derive(Debug)]
pub struct ObjectCheckpointStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectCheckpointStore {
    /// Create a new store writing under `prefix` in the given object store
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        info!(prefix = %prefix, "object checkpoint store initialized");
        Self { store, prefix }
    }

    fn partition_path(&self, partition: u32) -> ObjectPath {
        ObjectPath::from(format!("{}/partition-{partition}.json", self.prefix))
    }
}

#[async_trait]
impl CheckpointBackend for ObjectCheckpointStore {
    async fn load(&self, partition: u32) -> Result<Option<Offset>> {
        let path = self.partition_path(partition);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(partition, "no checkpoint object found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let data = result.bytes().await?;
        let doc: CheckpointDocument = serde_json::from_slice(&data).map_err(|e| {
            CheckpointerError::CorruptedData(format!(
                "failed to parse checkpoint for partition {partition}: {e}"
            ))
        })?;

        debug!(partition, offset = %doc.offset, "checkpoint loaded from object store");
        Ok(Some(doc.offset))
    }

    async fn store(&self, partition: u32, offset: &Offset) -> Result<()> {
        let path = self.partition_path(partition);
        let doc = CheckpointDocument::new(offset);
        let data = serde_json::to_vec(&doc)?;

        self.store.put(&path, PutPayload::from(data)).await?;

        debug!(partition, offset = %offset, "checkpoint stored to object store");
        Ok(())
    }
}
