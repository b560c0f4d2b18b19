//! Offset batch queue
//!
//! An ordered sequence of time-bucketed offset records, owned exclusively
//! by one agent worker. Updates landing within the same wall-clock second
//! are coalesced into the tail record; `queued_count` tracks the total
//! number of individual updates represented across all records, which is
//! what the count threshold compares against (not the number of records).

use std::collections::VecDeque;

use crate::offset::Offset;

/// One time bucket of coalesced offset updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OffsetRecord {
    /// Newest offset seen during this second
    pub offset: Offset,

    /// Wall-clock second this record covers
    pub epoch_secs: i64,

    /// Number of updates coalesced into this record
    pub count: u64,
}

/// In-memory batching queue for one partition
///
/// Invariant: records are ordered by strictly increasing `epoch_secs`, at
/// most one record per distinct second.
#[derive(Debug, Default)]
pub(crate) struct OffsetBatchQueue {
    records: VecDeque<OffsetRecord>,
    queued_count: u64,
}

impl OffsetBatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted offset update at wall-clock second `now`
    ///
    /// Updates the tail record in place when `now` matches its second,
    /// otherwise appends a new record.
    pub fn push(&mut self, offset: Offset, now: i64) {
        match self.records.back_mut() {
            Some(tail) if tail.epoch_secs == now => {
                tail.offset = offset;
                tail.count += 1;
            }
            _ => {
                self.records.push_back(OffsetRecord {
                    offset,
                    epoch_secs: now,
                    count: 1,
                });
            }
        }
        self.queued_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Total number of individual updates represented in the queue
    pub fn queued_count(&self) -> u64 {
        self.queued_count
    }

    /// Dequeue every record that crossed a threshold, oldest first
    ///
    /// A record is eligible while the queue's `queued_count` is at or above
    /// `count_threshold`, or the head record is at least
    /// `time_threshold_secs` old. Returns the offset of the newest dequeued
    /// record, which is the value to persist; `None` means nothing crossed
    /// a threshold.
    pub fn drain_eligible(
        &mut self,
        now: i64,
        time_threshold_secs: u64,
        count_threshold: u64,
    ) -> Option<Offset> {
        let mut to_store = None;

        loop {
            let eligible = match self.records.front() {
                Some(head) => {
                    self.queued_count >= count_threshold
                        || now.saturating_sub(head.epoch_secs) >= time_threshold_secs as i64
                }
                None => false,
            };
            if !eligible {
                break;
            }

            if let Some(head) = self.records.pop_front() {
                self.queued_count = self.queued_count.saturating_sub(head.count);
                to_store = Some(head.offset);
            }

            // Re-sync against counter drift
            if self.records.is_empty() {
                self.queued_count = 0;
            }
        }

        to_store
    }
}
