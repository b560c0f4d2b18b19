//! Per-partition checkpoint agent
//!
//! One [`CheckpointAgent`] owns the checkpoint lifecycle for exactly one
//! partition. All mutable state (current offset, batch queue, lifecycle
//! state) belongs to a single worker task reading commands from a bounded
//! mailbox, so commands are processed strictly in arrival order and no
//! locking is needed.
//!
//! ## Lifecycle
//!
//! The worker starts `NotReady`. The first command triggers a backend load;
//! while the load is outstanding no other command is processed (they queue
//! in the mailbox), so at most one load is ever in flight and a read is
//! never served against a not-yet-loaded offset. A failed load is retried
//! lazily: the triggering command is stashed, and the next command arrival
//! triggers another attempt; stashed commands replay in arrival order after
//! the first successful load.
//!
//! A flush drains every batch record that crossed the time or count
//! threshold and persists the newest drained offset in a single backend
//! write. The write itself runs concurrently with the mailbox: while it is
//! outstanding the agent keeps serving reads and updates but drops further
//! flush triggers, so a slow backend cannot pile up flushes.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

mod queue;
mod scheduler;

use crate::backend::{create_backend, CheckpointBackend};
use crate::config::CheckpointConfig;
use crate::error::{CheckpointerError, Result};
use crate::offset::Offset;
use queue::OffsetBatchQueue;
use scheduler::FlushScheduler;

/// Commands accepted by the agent worker
pub(crate) enum AgentCommand {
    /// Reply with the current offset
    ReadCurrent {
        reply: oneshot::Sender<Offset>,
    },
    /// Apply an offset update; fire-and-forget
    UpdateCurrent {
        offset: Offset,
    },
    /// Run the flush algorithm if applicable; fire-and-forget
    FlushTrigger,
    Shutdown,
}

/// Lifecycle state of the agent worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    /// No checkpoint loaded yet; the next command triggers a load
    NotReady,
    /// Backend load in flight; commands wait in the mailbox
    LoadingOffset,
    /// Serving reads, updates, and flush triggers
    Ready,
    /// Backend store in flight; flush triggers are dropped
    Flushing,
}

struct StoreOutcome {
    offset: Offset,
    result: Result<()>,
}

/// What woke the worker loop
enum WorkerEvent {
    Command(Option<AgentCommand>),
    FlushDone(std::result::Result<StoreOutcome, oneshot::error::RecvError>),
}

/// Handle to a running checkpoint agent
///
/// Cheap to clone; all clones feed the same worker mailbox.
#[derive(Clone)]
pub struct CheckpointAgent {
    partition: u32,
    tx: mpsc::Sender<AgentCommand>,
}

impl CheckpointAgent {
    /// Start an agent for `partition` with an explicit backend
    pub fn spawn(
        partition: u32,
        config: CheckpointConfig,
        backend: Arc<dyn CheckpointBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let worker = AgentWorker::new(partition, config, backend, tx.clone());
        tokio::spawn(worker.run(rx));

        info!(partition, "checkpoint agent started");
        Ok(Self { partition, tx })
    }

    /// Start an agent resolving the backend from configuration
    ///
    /// An unrecognized backend type fails here, before the agent starts.
    pub fn from_config(partition: u32, config: CheckpointConfig) -> Result<Self> {
        let backend = create_backend(&config)?;
        Self::spawn(partition, config, backend)
    }

    /// The partition this agent manages
    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Read the current offset
    ///
    /// Waits until the initial checkpoint load has completed; never returns
    /// a stale or placeholder value.
    pub async fn read_current(&self) -> Result<Offset> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentCommand::ReadCurrent { reply })
            .await
            .map_err(|_| CheckpointerError::Agent("agent mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| CheckpointerError::Agent("agent stopped before replying".to_string()))
    }

    /// Submit an offset update; fire-and-forget
    ///
    /// Updates that do not advance the current offset, and updates that are
    /// not base-10 integers, are discarded by the worker.
    pub async fn update_current(&self, offset: impl Into<Offset>) -> Result<()> {
        self.tx
            .send(AgentCommand::UpdateCurrent {
                offset: offset.into(),
            })
            .await
            .map_err(|_| CheckpointerError::Agent("agent mailbox closed".to_string()))
    }

    /// Request a flush; fire-and-forget
    ///
    /// The flush only writes when a batch record crossed a threshold; a
    /// trigger arriving while a previous store is in flight is dropped.
    /// Store failures surface in logs only, never through this call.
    pub async fn flush_now(&self) -> Result<()> {
        self.tx
            .send(AgentCommand::FlushTrigger)
            .await
            .map_err(|_| CheckpointerError::Agent("agent mailbox closed".to_string()))
    }

    /// Stop the agent worker
    pub async fn shutdown(self) -> Result<()> {
        self.tx
            .send(AgentCommand::Shutdown)
            .await
            .map_err(|_| CheckpointerError::Agent("agent mailbox closed".to_string()))
    }
}

/// Worker task owning all mutable state for one partition
struct AgentWorker {
    partition: u32,
    config: CheckpointConfig,
    backend: Arc<dyn CheckpointBackend>,
    state: AgentState,
    current: Offset,
    current_numeric: i64,
    queue: OffsetBatchQueue,
    /// Commands deferred across failed loads, replayed in arrival order
    stash: VecDeque<AgentCommand>,
    scheduler: FlushScheduler,
    /// Sender into our own mailbox, handed to the flush scheduler
    command_tx: mpsc::Sender<AgentCommand>,
}

impl AgentWorker {
    fn new(
        partition: u32,
        config: CheckpointConfig,
        backend: Arc<dyn CheckpointBackend>,
        command_tx: mpsc::Sender<AgentCommand>,
    ) -> Self {
        Self {
            partition,
            config,
            backend,
            state: AgentState::NotReady,
            current: Offset::start_of_stream(),
            current_numeric: -1,
            queue: OffsetBatchQueue::new(),
            stash: VecDeque::new(),
            scheduler: FlushScheduler::new(),
            command_tx,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<AgentCommand>) {
        // Completion signal of the in-flight store, when state is Flushing
        let mut flush_done: Option<oneshot::Receiver<StoreOutcome>> = None;

        loop {
            let event = if let Some(done) = &mut flush_done {
                tokio::select! {
                    outcome = done => WorkerEvent::FlushDone(outcome),
                    cmd = rx.recv() => WorkerEvent::Command(cmd),
                }
            } else {
                WorkerEvent::Command(rx.recv().await)
            };

            let cmd = match event {
                WorkerEvent::FlushDone(outcome) => {
                    self.complete_flush(outcome);
                    flush_done = None;
                    continue;
                }
                WorkerEvent::Command(cmd) => cmd,
            };

            let Some(cmd) = cmd else {
                break;
            };
            if matches!(cmd, AgentCommand::Shutdown) {
                info!(partition = self.partition, "checkpoint agent shutting down");
                break;
            }

            let started = match self.state {
                AgentState::NotReady | AgentState::LoadingOffset => {
                    self.load_then_replay(cmd).await
                }
                AgentState::Ready | AgentState::Flushing => self.handle_serving(cmd),
            };
            if started.is_some() {
                flush_done = started;
            }
        }

        debug!(partition = self.partition, "checkpoint agent worker exited");
    }

    /// First activity in `NotReady`: defer the command, load the checkpoint
    ///
    /// The load is awaited inline, blocking this worker's mailbox, so no
    /// command can observe a half-initialized offset and at most one load is
    /// ever outstanding. On failure the stash is retained and the next
    /// command arrival retries the load; there is no retry timer and no
    /// bound on attempts.
    async fn load_then_replay(
        &mut self,
        cmd: AgentCommand,
    ) -> Option<oneshot::Receiver<StoreOutcome>> {
        self.stash.push_back(cmd);
        self.state = AgentState::LoadingOffset;
        debug!(
            partition = self.partition,
            deferred = self.stash.len(),
            "loading checkpoint"
        );

        match self.backend.load(self.partition).await {
            Ok(found) => {
                let loaded = match found {
                    Some(offset) => offset,
                    None => {
                        info!(
                            partition = self.partition,
                            "no checkpoint found, starting from beginning of stream"
                        );
                        Offset::start_of_stream()
                    }
                };
                let numeric = match loaded.numeric() {
                    Ok(n) => n,
                    Err(e) => {
                        error!(
                            partition = self.partition,
                            offset = %loaded,
                            error = %e,
                            "stored checkpoint is not numeric, will retry on next command"
                        );
                        self.state = AgentState::NotReady;
                        return None;
                    }
                };

                self.current = loaded;
                self.current_numeric = numeric;
                self.state = AgentState::Ready;
                info!(
                    partition = self.partition,
                    offset = %self.current,
                    "checkpoint loaded"
                );

                // Replay deferred commands in arrival order. At most one of
                // them can start a store; triggers after it hit Flushing and
                // are dropped.
                let mut started = None;
                while let Some(deferred) = self.stash.pop_front() {
                    if let Some(done) = self.handle_serving(deferred) {
                        started = Some(done);
                    }
                }
                started
            }
            Err(e) => {
                error!(
                    partition = self.partition,
                    error = %e,
                    "checkpoint load failed, will retry on next command"
                );
                self.state = AgentState::NotReady;
                None
            }
        }
    }

    /// Handle one command in `Ready` or `Flushing`
    fn handle_serving(&mut self, cmd: AgentCommand) -> Option<oneshot::Receiver<StoreOutcome>> {
        match cmd {
            AgentCommand::ReadCurrent { reply } => {
                let _ = reply.send(self.current.clone());
                None
            }
            AgentCommand::UpdateCurrent { offset } => {
                self.apply_update(offset);
                None
            }
            AgentCommand::FlushTrigger => {
                if self.state == AgentState::Flushing {
                    debug!(
                        partition = self.partition,
                        "flush already in progress, dropping trigger"
                    );
                    return None;
                }
                self.begin_flush()
            }
            AgentCommand::Shutdown => None,
        }
    }

    /// Apply an offset update in `Ready` or `Flushing`
    fn apply_update(&mut self, candidate: Offset) {
        // First update arms periodic flushing, so triggers only start once
        // there has been something to flush.
        self.scheduler.ensure_started(
            self.partition,
            &self.command_tx,
            Duration::from_secs(self.config.checkpoint_frequency_secs),
        );

        let candidate_numeric = match candidate.numeric() {
            Ok(n) => n,
            Err(_) => {
                warn!(
                    partition = self.partition,
                    offset = %candidate,
                    "ignoring non-numeric offset update"
                );
                return;
            }
        };

        // Current offset never decreases
        if candidate_numeric <= self.current_numeric {
            trace!(
                partition = self.partition,
                offset = %candidate,
                current = %self.current,
                "discarding offset update that does not advance"
            );
            return;
        }

        let now = Utc::now().timestamp();
        self.queue.push(candidate.clone(), now);
        self.current = candidate;
        self.current_numeric = candidate_numeric;

        trace!(
            partition = self.partition,
            offset = %self.current,
            queued = self.queue.queued_count(),
            "offset updated"
        );
    }

    /// Run the flush algorithm; start a store if a record crossed a threshold
    ///
    /// The drain happens here, synchronously, against the worker-owned
    /// queue; only the backend write runs concurrently. Records dequeued for
    /// a store that later fails are not restored: the next successful flush
    /// persists a newer offset and masks the gap.
    fn begin_flush(&mut self) -> Option<oneshot::Receiver<StoreOutcome>> {
        if self.queue.is_empty() {
            debug!(partition = self.partition, "flush requested with empty queue");
            return None;
        }

        let now = Utc::now().timestamp();
        let offset = match self.queue.drain_eligible(
            now,
            self.config.time_threshold_secs,
            self.config.count_threshold,
        ) {
            Some(offset) => offset,
            None => {
                debug!(
                    partition = self.partition,
                    queued = self.queue.queued_count(),
                    "flush skipped, no record crossed a threshold"
                );
                return None;
            }
        };

        debug!(
            partition = self.partition,
            offset = %offset,
            records_left = self.queue.len(),
            "flush started"
        );

        let (done_tx, done_rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let partition = self.partition;
        tokio::spawn(async move {
            let result = backend.store(partition, &offset).await;
            let _ = done_tx.send(StoreOutcome { offset, result });
        });

        self.state = AgentState::Flushing;
        Some(done_rx)
    }

    /// Store completed; back to `Ready` regardless of outcome
    fn complete_flush(&mut self, outcome: std::result::Result<StoreOutcome, oneshot::error::RecvError>) {
        match outcome {
            Ok(StoreOutcome {
                offset,
                result: Ok(()),
            }) => {
                debug!(
                    partition = self.partition,
                    offset = %offset,
                    "checkpoint stored"
                );
            }
            Ok(StoreOutcome {
                offset,
                result: Err(e),
            }) => {
                warn!(
                    partition = self.partition,
                    offset = %offset,
                    error = %e,
                    "checkpoint store failed, flushed records dropped"
                );
            }
            Err(_) => {
                warn!(
                    partition = self.partition,
                    "checkpoint store task dropped before completing"
                );
            }
        }
        self.state = AgentState::Ready;
    }
}
