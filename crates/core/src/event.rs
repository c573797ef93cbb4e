// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-job status event log.

use crate::clock::Clock;
use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// A job's lifecycle state, in the only order events may be appended:
/// `Acknowledged -> Started -> (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Acknowledged,
    Started,
    Completed,
    Failed,
}

crate::simple_display! {
    EventKind {
        Acknowledged => "acknowledged",
        Started => "started",
        Completed => "completed",
        Failed => "failed",
    }
}

impl EventKind {
    /// True if `next` may legally follow `self` in a job's event log.
    pub fn can_transition_to(self, next: EventKind) -> bool {
        matches!(
            (self, next),
            (EventKind::Acknowledged, EventKind::Started)
                | (EventKind::Started, EventKind::Completed)
                | (EventKind::Started, EventKind::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Completed | EventKind::Failed)
    }
}

/// One entry in a job's append-only status log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub job_id: JobId,
    /// Monotonically increasing per job, starting at 1. Used both to order
    /// events within a single job and to detect duplicate appends from
    /// redelivered messages.
    pub sequence: u64,
    pub kind: EventKind,
    /// Sanitized hostname of the worker that emitted this event.
    pub worker: String,
    pub at_ms: u64,
    /// Present only on `Failed` events.
    pub error: Option<String>,
    /// Present only on terminal (`Completed`/`Failed`) events.
    pub duration_ms: Option<u64>,
}

impl StatusEvent {
    pub fn new(clock: &impl Clock, job_id: JobId, sequence: u64, kind: EventKind, worker: impl Into<String>) -> Self {
        Self { job_id, sequence, kind, worker: worker.into(), at_ms: clock.epoch_ms(), error: None, duration_ms: None }
    }

    pub fn failed(clock: &impl Clock, job_id: JobId, sequence: u64, worker: impl Into<String>, error: impl Into<String>) -> Self {
        Self { job_id, sequence, kind: EventKind::Failed, worker: worker.into(), at_ms: clock.epoch_ms(), error: Some(error.into()), duration_ms: None }
    }

    /// Attach the elapsed time of the operation that produced this
    /// terminal event.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// The event log key prefix for this job: `events.<job-id>.`. Storage
    /// appends the sequence number to get the per-event key.
    pub fn log_prefix(job_id: &JobId) -> String {
        format!("events.{job_id}.")
    }

    pub fn store_key(&self) -> String {
        format!("{}{:020}", Self::log_prefix(&self.job_id), self.sequence)
    }
}
