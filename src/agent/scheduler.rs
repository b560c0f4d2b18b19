//! Periodic flush triggering
//!
//! The scheduler feeds flush-trigger commands into the agent's own mailbox
//! at the configured checkpoint frequency, preserving the single-consumer
//! discipline: the timer never touches agent state directly. It is armed
//! lazily by the first offset update, so no trigger ever fires before there
//! has been something to flush.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::AgentCommand;

/// Lazily armed periodic flush trigger for one agent
#[derive(Debug, Default)]
pub(crate) struct FlushScheduler {
    started: bool,
}

impl FlushScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the scheduler if it is not already running
    ///
    /// Spawns a timer task that sends a flush trigger into the agent's
    /// mailbox every `frequency`, for the agent's lifetime. The task exits
    /// when the mailbox closes.
    pub fn ensure_started(
        &mut self,
        partition: u32,
        tx: &mpsc::Sender<AgentCommand>,
        frequency: Duration,
    ) {
        if self.started {
            return;
        }
        self.started = true;

        let tx = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(frequency);
            // The first tick completes immediately; the schedule starts one
            // full period from now.
            interval.tick().await;

            loop {
                interval.tick().await;
                if tx.send(AgentCommand::FlushTrigger).await.is_err() {
                    debug!(partition, "agent mailbox closed, flush scheduler stopping");
                    break;
                }
            }
        });

        debug!(
            partition,
            frequency_secs = frequency.as_secs(),
            "flush scheduler armed"
        );
    }

    #[cfg(test)]
    pub fn is_started(&self) -> bool {
        self.started
    }
}
