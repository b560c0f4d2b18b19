//! Filesystem checkpoint backend
//!
//! Persists one JSON document per partition under a base directory. Writes
//! go to a temp file first and are renamed into place, so a crash mid-write
//! never leaves a torn checkpoint behind.

use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{CheckpointBackend, CheckpointDocument};
use crate::error::{CheckpointerError, Result};
use crate::offset::Offset;

/// Filesystem-backed checkpoint store
#[derive(Debug)]
pub struct FileCheckpointStore {
    /// Base directory for checkpoint documents
    base_path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a new store rooted at `base_path`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        info!(base_path = %base_path.display(), "file checkpoint store initialized");
        Ok(Self { base_path })
    }

    fn partition_path(&self, partition: u32) -> PathBuf {
        self.base_path.join(format!("partition-{partition}.json"))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");

        // Write and sync in a block so the file is closed before rename
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointBackend for FileCheckpointStore {
    async fn load(&self, partition: u32) -> Result<Option<Offset>> {
        let path = self.partition_path(partition);

        if !path.exists() {
            debug!(partition, "no checkpoint file found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let doc: CheckpointDocument = serde_json::from_str(&content).map_err(|e| {
            CheckpointerError::CorruptedData(format!(
                "failed to parse checkpoint for partition {partition}: {e}"
            ))
        })?;

        debug!(partition, offset = %doc.offset, "checkpoint loaded from file");
        Ok(Some(doc.offset))
    }

    async fn store(&self, partition: u32, offset: &Offset) -> Result<()> {
        let path = self.partition_path(partition);
        let doc = CheckpointDocument::new(offset);
        let data = serde_json::to_string_pretty(&doc)?;

        self.write_atomic(&path, data.as_bytes())?;

        debug!(partition, offset = %offset, "checkpoint stored to file");
        Ok(())
    }
}
