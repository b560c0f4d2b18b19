//! Checkpoint backends
//!
//! This module defines the trait that abstracts durable checkpoint stores,
//! enabling pluggable implementations selected by configured name:
//!
//! - [`ObjectCheckpointStore`]: object storage, one object per partition
//! - [`FileCheckpointStore`]: local filesystem, one JSON document per partition
//! - [`MemoryCheckpointStore`]: in-process map for tests and ephemeral runs
//!
//! Backends are safe to share across many partitions' agents; per-call
//! isolation is by partition key only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::Result;
use crate::offset::Offset;

mod factory;
mod file;
mod memory;
mod object;

pub use factory::create_backend;
pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use object::ObjectCheckpointStore;

/// Durable key(partition) -> offset(string) store
///
/// Implementations provide different durability trade-offs but share the
/// same contract: `store` replaces any previous value for the partition,
/// and `load` returns `None` when nothing has ever been stored.
#[async_trait]
pub trait CheckpointBackend: Send + Sync + Debug {
    /// Read the last stored offset for a partition
    ///
    /// Returns `None` when no checkpoint exists for the partition.
    async fn load(&self, partition: u32) -> Result<Option<Offset>>;

    /// Durably store the offset for a partition
    ///
    /// Replaces any previously stored value. No partial-write semantics are
    /// assumed by callers.
    async fn store(&self, partition: u32, offset: &Offset) -> Result<()>;
}

/// Persisted checkpoint document
///
/// Both durable backends write this small JSON document; the timestamp and
/// version are informational and not consulted on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CheckpointDocument {
    /// The checkpointed offset
    pub offset: Offset,

    /// Wall-clock time the checkpoint was written, milliseconds since epoch
    pub timestamp: i64,

    /// Version of the checkpoint format
    pub version: u16,
}

impl CheckpointDocument {
    pub(crate) fn new(offset: &Offset) -> Self {
        Self {
            offset: offset.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            version: 1,
        }
    }
}
