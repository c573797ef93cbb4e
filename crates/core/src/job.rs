// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable `Job` record, written once at submission time.

use crate::clock::Clock;
use crate::id::JobId;
use crate::subject::{Mode, Subject, TargetSelector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job as stored in the job store. Write-once: nothing in this struct is
/// ever mutated after the initial put. Processing state lives in the
/// separate append-only event log, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub mode: Mode,
    pub target: TargetSelector,
    /// `<category>.<operation>`, e.g. `"command.exec.execute"`.
    pub operation: String,
    /// Operation-specific parameters, opaque to the dispatcher/storage layers.
    pub params: Value,
    /// Epoch milliseconds at submission time, used for the `JobId` timestamp
    /// component and for TTL/expiry bookkeeping.
    pub created_at_ms: u64,
}

impl Job {
    /// Build a new job from a parsed subject, generating a fresh ID from `clock`.
    pub fn new(clock: &impl Clock, subject: &Subject, params: Value) -> Self {
        Self {
            id: JobId::new(clock),
            mode: subject.mode,
            target: subject.selector.clone(),
            operation: subject.operation_type(),
            params,
            created_at_ms: clock.epoch_ms(),
        }
    }

    pub fn store_key(&self) -> String {
        self.id.store_key()
    }

    pub fn category(&self) -> &str {
        self.operation.split_once('.').map_or(self.operation.as_str(), |(cat, _)| cat)
    }

    pub fn operation_name(&self) -> &str {
        self.operation.split_once('.').map_or("", |(_, op)| op)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Job {
    /// Test-only builder with sane defaults; production code always goes
    /// through [`Job::new`] so the ID and creation timestamp stay consistent.
    pub fn test_builder(clock: &impl Clock) -> JobBuilder {
        JobBuilder {
            id: JobId::new(clock),
            mode: Mode::Modify,
            target: TargetSelector::Any,
            operation: "command.exec.execute".to_string(),
            params: Value::Null,
            created_at_ms: clock.epoch_ms(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    id: JobId,
    mode: Mode,
    target: TargetSelector,
    operation: String,
    params: Value,
    created_at_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn target(mut self, target: TargetSelector) -> Self {
        self.target = target;
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn build(self) -> Job {
        Job {
            id: self.id,
            mode: self.mode,
            target: self.target,
            operation: self.operation,
            params: self.params,
            created_at_ms: self.created_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    #[test]
    fn new_job_derives_fields_from_subject() {
        let clock = FakeClock::new();
        let subject = Subject::new(Mode::Modify, TargetSelector::Host("web_01".into()), "command", "exec.execute");
        let job = Job::new(&clock, &subject, serde_json::json!({"command": "uptime"}));
        assert_eq!(job.operation, "command.exec.execute");
        assert_eq!(job.category(), "command");
        assert_eq!(job.operation_name(), "exec.execute");
        assert_eq!(job.store_key(), format!("jobs.{}", job.id));
    }

    #[test]
    fn two_jobs_from_same_clock_tick_still_get_distinct_ids() {
        let clock = FakeClock::new();
        let subject = Subject::new(Mode::Query, TargetSelector::Any, "node", "hostname.get");
        let a = Job::new(&clock, &subject, Value::Null);
        let b = Job::new(&clock, &subject, Value::Null);
        assert_ne!(a.id, b.id);
    }
}
