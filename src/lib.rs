#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Checkpointer
//!
//! Checkpointer tracks, batches, and durably persists the last-consumed
//! read position ("offset") for one partition of an event stream, so a
//! consumer can resume after restart without reprocessing or skipping
//! events. One [`CheckpointAgent`] manages exactly one partition; a
//! deployment runs one agent per partition.
//!
//! ## Design
//!
//! Each agent is a single tokio task that owns all of its mutable state
//! (current offset, batch queue, lifecycle state) and processes commands
//! strictly in arrival order from a bounded mailbox, so it needs no locks.
//! Offset updates arriving within the same wall-clock second are coalesced
//! into one queue record; a flush persists the oldest record that crossed
//! the time or count threshold, folding an arbitrary number of intervening
//! updates into a single durable write.
//!
//! The first checkpoint load happens lazily on the first command; until it
//! completes, commands are deferred and replayed in order, so a read never
//! observes a not-yet-loaded offset.
//!
//! ## Usage
//!
//! ```no_run
//! use checkpointer::{CheckpointAgent, CheckpointConfig};
//!
//! #[tokio::main]
//! async fn main() -> checkpointer::Result<()> {
//!     let config = CheckpointConfig {
//!         backend: "memory".to_string(),
//!         count_threshold: 100,
//!         ..CheckpointConfig::default()
//!     };
//!
//!     // One agent per partition
//!     let agent = CheckpointAgent::from_config(3, config)?;
//!
//!     agent.update_current("100").await?;
//!     let current = agent.read_current().await?;
//!     println!("current offset: {}", current);
//!
//!     agent.flush_now().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: the per-partition checkpoint agent and its command surface
//! - [`backend`]: durable checkpoint stores and the backend factory
//! - [`config`]: checkpointing configuration and validation
//! - [`offset`]: the offset position marker type
//! - [`error`]: error types and Result alias

pub mod agent;
pub mod backend;
pub mod config;
pub mod error;
pub mod offset;

pub use agent::CheckpointAgent;
pub use backend::{
    create_backend, CheckpointBackend, FileCheckpointStore, MemoryCheckpointStore,
    ObjectCheckpointStore,
};
pub use config::CheckpointConfig;
pub use error::{CheckpointerError, Result};
pub use offset::Offset;
