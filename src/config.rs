//! Checkpointing configuration
//!
//! Configuration is read at agent construction; the flush thresholds are
//! consulted on every flush. [`CheckpointConfig::validate`] runs before the
//! agent starts so a misconfiguration fails fast instead of at first flush.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CheckpointerError, Result};

/// Checkpointing configuration for one partition agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Backend type: "blob", "file", or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base directory for the "file" and "blob" backends
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Key prefix under which the "blob" backend stores checkpoints
    #[serde(default = "default_blob_prefix")]
    pub blob_prefix: String,

    /// Interval between scheduled flush triggers, in seconds
    #[serde(default = "default_frequency_secs")]
    pub checkpoint_frequency_secs: u64,

    /// Maximum age in seconds an offset record may sit unflushed
    #[serde(default = "default_time_threshold_secs")]
    pub time_threshold_secs: u64,

    /// Maximum number of coalesced updates allowed to accumulate unflushed
    #[serde(default = "default_count_threshold")]
    pub count_threshold: u64,

    /// Capacity of the agent's command mailbox
    ///
    /// A full mailbox backpressures senders; it does not drop commands.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_backend() -> String {
    "file".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/checkpoints")
}
fn default_blob_prefix() -> String {
    "checkpoints".to_string()
}
fn default_frequency_secs() -> u64 {
    10
}
fn default_time_threshold_secs() -> u64 {
    60
}
fn default_count_threshold() -> u64 {
    1000
}
fn default_mailbox_capacity() -> usize {
    1024
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            blob_prefix: default_blob_prefix(),
            checkpoint_frequency_secs: default_frequency_secs(),
            time_threshold_secs: default_time_threshold_secs(),
            count_threshold: default_count_threshold(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

impl CheckpointConfig {
    /// Validate the configuration
    ///
    /// Zero thresholds or a zero flush frequency would make the flush loop
    /// degenerate, so they are rejected before the agent starts.
    pub fn validate(&self) -> Result<()> {
        if self.backend.is_empty() {
            return Err(CheckpointerError::config_msg(
                "checkpoint backend type must not be empty",
            ));
        }
        if self.checkpoint_frequency_secs == 0 {
            return Err(CheckpointerError::config_msg(
                "checkpoint_frequency_secs must be at least 1",
            ));
        }
        if self.time_threshold_secs == 0 {
            return Err(CheckpointerError::config_msg(
                "time_threshold_secs must be at least 1",
            ));
        }
        if self.count_threshold == 0 {
            return Err(CheckpointerError::config_msg(
                "count_threshold must be at least 1",
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(CheckpointerError::config_msg(
                "mailbox_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}
