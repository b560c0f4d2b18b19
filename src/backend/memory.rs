//! In-memory checkpoint backend
//!
//! Holds checkpoints in a process-local map. Nothing survives a restart,
//! which makes this backend suitable for tests and ephemeral deployments
//! where resuming from start-of-stream is acceptable.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::CheckpointBackend;
use crate::error::Result;
use crate::offset::Offset;

/// In-process checkpoint store
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<HashMap<u32, Offset>>,
}

impl MemoryCheckpointStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointBackend for MemoryCheckpointStore {
    async fn load(&self, partition: u32) -> Result<Option<Offset>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&partition).cloned())
    }

    async fn store(&self, partition: u32, offset: &Offset) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(partition, offset.clone());
        debug!(partition, offset = %offset, "checkpoint stored in memory");
        Ok(())
    }
}
