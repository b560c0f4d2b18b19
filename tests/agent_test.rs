//! Integration tests for the checkpoint agent command surface.
//!
//! These tests exercise the agent end to end through its public handle,
//! covering:
//!
//! - Resuming from a stored checkpoint vs. the start-of-stream sentinel
//! - Monotonic offset application
//! - Count-threshold and below-threshold flush behavior
//! - Deferred-command ordering around the initial load
//! - Lazy load retry after backend failures
//! - Flush-trigger dropping while a store is in flight
//! - Scheduled flushing armed by the first update

use async_trait::async_trait;
use checkpointer::{
    CheckpointAgent, CheckpointBackend, CheckpointConfig, CheckpointerError, Offset, Result,
};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend double that records stores and can misbehave on demand.
#[derive(Debug, Default)]
struct RecordingBackend {
    /// Value returned by load once loads stop failing
    initial: Option<Offset>,
    /// Number of leading load calls that fail
    fail_loads: AtomicI32,
    /// Artificial store latency
    store_delay: Option<Duration>,
    loads: AtomicI32,
    stores: Mutex<Vec<(u32, String)>>,
}

impl RecordingBackend {
    fn new() -> Self {
        Self::default()
    }

    fn with_initial(offset: &str) -> Self {
        Self {
            initial: Some(Offset::new(offset)),
            ..Self::default()
        }
    }

    fn failing_first_loads(n: i32) -> Self {
        let backend = Self::default();
        backend.fail_loads.store(n, Ordering::SeqCst);
        backend
    }

    fn with_store_delay(delay: Duration) -> Self {
        Self {
            store_delay: Some(delay),
            ..Self::default()
        }
    }

    fn stores(&self) -> Vec<(u32, String)> {
        self.stores.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckpointBackend for RecordingBackend {
    async fn load(&self, _partition: u32) -> Result<Option<Offset>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(CheckpointerError::backend_msg("simulated load failure"));
        }
        Ok(self.initial.clone())
    }

    async fn store(&self, partition: u32, offset: &Offset) -> Result<()> {
        if let Some(delay) = self.store_delay {
            tokio::time::sleep(delay).await;
        }
        self.stores
            .lock()
            .unwrap()
            .push((partition, offset.as_str().to_string()));
        Ok(())
    }
}

fn test_config(count_threshold: u64) -> CheckpointConfig {
    CheckpointConfig {
        backend: "memory".to_string(),
        checkpoint_frequency_secs: 3600,
        time_threshold_secs: 3600,
        count_threshold,
        ..CheckpointConfig::default()
    }
}

async fn wait_for_stores(backend: &RecordingBackend, expected: usize) -> Vec<(u32, String)> {
    for _ in 0..100 {
        let stores = backend.stores();
        if stores.len() >= expected {
            return stores;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    backend.stores()
}

#[tokio::test]
async fn test_missing_checkpoint_starts_at_beginning_of_stream() {
    let backend = Arc::new(RecordingBackend::new());
    let agent = CheckpointAgent::spawn(3, test_config(1000), backend).unwrap();

    assert_eq!(agent.read_current().await.unwrap().as_str(), "-1");

    agent.update_current("100").await.unwrap();
    assert_eq!(agent.read_current().await.unwrap().as_str(), "100");
}

#[tokio::test]
async fn test_resumes_from_stored_checkpoint() {
    let backend = Arc::new(RecordingBackend::with_initial("4242"));
    let agent = CheckpointAgent::spawn(0, test_config(1000), backend).unwrap();

    assert_eq!(agent.read_current().await.unwrap().as_str(), "4242");

    // Updates at or below the checkpoint are discarded
    agent.update_current("4242").await.unwrap();
    agent.update_current("4000").await.unwrap();
    assert_eq!(agent.read_current().await.unwrap().as_str(), "4242");
}

#[tokio::test]
async fn test_current_offset_is_maximum_value_seen() {
    let backend = Arc::new(RecordingBackend::new());
    let agent = CheckpointAgent::spawn(0, test_config(1000), backend).unwrap();

    for offset in ["10", "4", "25", "25", "11"] {
        agent.update_current(offset).await.unwrap();
    }

    assert_eq!(agent.read_current().await.unwrap().as_str(), "25");
}

#[tokio::test]
async fn test_count_threshold_flush_stores_newest_drained_offset() {
    let backend = Arc::new(RecordingBackend::new());
    let agent = CheckpointAgent::spawn(7, test_config(5), backend.clone()).unwrap();

    for offset in ["1", "2", "3", "4", "5"] {
        agent.update_current(offset).await.unwrap();
    }
    agent.flush_now().await.unwrap();

    let stores = wait_for_stores(&backend, 1).await;
    assert_eq!(stores, vec![(7, "5".to_string())]);

    // The queue drained completely; another flush writes nothing
    agent.flush_now().await.unwrap();
    agent.read_current().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.stores().len(), 1);
}

#[tokio::test]
async fn test_flush_below_thresholds_writes_nothing() {
    let backend = Arc::new(RecordingBackend::new());
    let agent = CheckpointAgent::spawn(0, test_config(1000), backend.clone()).unwrap();

    agent.update_current("1").await.unwrap();
    agent.flush_now().await.unwrap();

    agent.read_current().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(backend.stores().is_empty());

    // The update is still queued and still the current offset
    assert_eq!(agent.read_current().await.unwrap().as_str(), "1");
}

#[tokio::test]
async fn test_flush_with_empty_queue_writes_nothing() {
    let backend = Arc::new(RecordingBackend::new());
    let agent = CheckpointAgent::spawn(0, test_config(1), backend.clone()).unwrap();

    agent.flush_now().await.unwrap();

    agent.read_current().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(backend.stores().is_empty());
}

#[tokio::test]
async fn test_commands_sent_during_load_are_processed_in_order() {
    // Fail the first load so the triggering command is deferred; the later
    // commands must still be observed in their original order.
    let backend = Arc::new(RecordingBackend::failing_first_loads(1));
    let agent = CheckpointAgent::spawn(0, test_config(1000), backend.clone()).unwrap();

    agent.update_current("5").await.unwrap();
    agent.update_current("7").await.unwrap();

    // This read lands after both updates in the mailbox, so once the retried
    // load succeeds and the stash replays, it must see "7".
    assert_eq!(agent.read_current().await.unwrap().as_str(), "7");
    assert!(backend.loads.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_load_failure_retries_on_next_command_only() {
    let backend = Arc::new(RecordingBackend::failing_first_loads(2));
    let agent = CheckpointAgent::spawn(0, test_config(1000), backend.clone()).unwrap();

    // First command: load attempt #1 fails, command deferred
    agent.update_current("3").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.loads.load(Ordering::SeqCst), 1);

    // Second command: attempt #2 fails too
    agent.update_current("4").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.loads.load(Ordering::SeqCst), 2);

    // Third command: attempt #3 succeeds, deferred updates replay in order
    assert_eq!(agent.read_current().await.unwrap().as_str(), "4");
    assert_eq!(backend.loads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_flush_trigger_during_flush_is_dropped() {
    let backend = Arc::new(RecordingBackend::with_store_delay(Duration::from_millis(
        200,
    )));
    let agent = CheckpointAgent::spawn(0, test_config(1), backend.clone()).unwrap();

    agent.update_current("1").await.unwrap();
    agent.flush_now().await.unwrap();

    // Reads and updates are still serviced while the store is outstanding
    agent.update_current("2").await.unwrap();
    assert_eq!(agent.read_current().await.unwrap().as_str(), "2");

    // This trigger arrives while the first store sleeps: dropped, not queued
    agent.flush_now().await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(backend.stores(), vec![(0, "1".to_string())]);

    // A later trigger flushes the second update normally
    agent.flush_now().await.unwrap();
    let stores = wait_for_stores(&backend, 2).await;
    assert_eq!(stores, vec![(0, "1".to_string()), (0, "2".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_first_update_arms_periodic_flushing() {
    let backend = Arc::new(RecordingBackend::new());
    let config = CheckpointConfig {
        backend: "memory".to_string(),
        checkpoint_frequency_secs: 2,
        time_threshold_secs: 3600,
        count_threshold: 1,
        ..CheckpointConfig::default()
    };
    let agent = CheckpointAgent::spawn(0, config, backend.clone()).unwrap();

    agent.update_current("9").await.unwrap();

    // No explicit flush_now: the scheduler's trigger drives the store
    tokio::time::sleep(Duration::from_secs(3)).await;
    let stores = wait_for_stores(&backend, 1).await;
    assert_eq!(stores, vec![(0, "9".to_string())]);
}

#[tokio::test]
async fn test_store_failure_keeps_current_offset_and_drops_records() {
    /// Store double that always fails.
    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl CheckpointBackend for FailingStore {
        async fn load(&self, _partition: u32) -> Result<Option<Offset>> {
            Ok(None)
        }
        async fn store(&self, _partition: u32, _offset: &Offset) -> Result<()> {
            Err(CheckpointerError::backend_msg("simulated store failure"))
        }
    }

    let agent = CheckpointAgent::spawn(0, test_config(1), Arc::new(FailingStore)).unwrap();

    agent.update_current("11").await.unwrap();
    agent.flush_now().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The failed store drops its records but never touches the current offset
    assert_eq!(agent.read_current().await.unwrap().as_str(), "11");

    // A later update still flows through the normal path
    agent.update_current("12").await.unwrap();
    assert_eq!(agent.read_current().await.unwrap().as_str(), "12");
}
