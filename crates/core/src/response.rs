// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-writer-wins per-worker job response.

use crate::clock::Clock;
use crate::id::JobId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a modify operation actually changed anything on the target.
/// A third state is needed because some providers cannot tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Changed {
    Yes,
    No,
    Unknown,
}

crate::simple_display! {
    Changed {
        Yes => "yes",
        No => "no",
        Unknown => "unknown",
    }
}

/// A worker's response to a job. For unicast/any jobs there is exactly one;
/// for broadcast jobs (`_all` or `label:`) there is one per responding
/// worker, keyed by `(job_id, worker)`. A later write from the same worker
/// for the same job overwrites the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub job_id: JobId,
    pub worker: String,
    pub ok: bool,
    pub changed: Changed,
    /// Operation-specific result payload, opaque above the provider layer.
    pub data: Value,
    pub error: Option<String>,
    pub at_ms: u64,
}

impl Response {
    pub fn success(clock: &impl Clock, job_id: JobId, worker: impl Into<String>, changed: Changed, data: Value) -> Self {
        Self { job_id, worker: worker.into(), ok: true, changed, data, error: None, at_ms: clock.epoch_ms() }
    }

    pub fn failure(clock: &impl Clock, job_id: JobId, worker: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            worker: worker.into(),
            ok: false,
            changed: Changed::Unknown,
            data: Value::Null,
            error: Some(error.into()),
            at_ms: clock.epoch_ms(),
        }
    }

    /// The store key for this response: `responses.<job-id>.<worker>`.
    pub fn store_key(&self) -> String {
        Self::key_for(&self.job_id, &self.worker)
    }

    pub fn key_for(job_id: &JobId, worker: &str) -> String {
        format!("responses.{job_id}.{worker}")
    }

    /// The key prefix used to list every response for a broadcast job.
    pub fn job_prefix(job_id: &JobId) -> String {
        format!("responses.{job_id}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    #[test]
    fn success_and_failure_responses_carry_expected_fields() {
        let clock = FakeClock::new();
        let job_id = JobId::new(&clock);
        let ok = Response::success(&clock, job_id, "web_01", Changed::Yes, serde_json::json!({"exit_code": 0}));
        assert!(ok.ok);
        assert_eq!(ok.changed, Changed::Yes);

        let err = Response::failure(&clock, job_id, "web_01", "connection refused");
        assert!(!err.ok);
        assert_eq!(err.changed, Changed::Unknown);
        assert_eq!(err.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn store_key_is_namespaced_by_job_and_worker() {
        let clock = FakeClock::new();
        let job_id = JobId::new(&clock);
        let response = Response::success(&clock, job_id, "web_01", Changed::No, Value::Null);
        assert_eq!(response.store_key(), format!("responses.{job_id}.web_01"));
        assert!(response.store_key().starts_with(&Response::job_prefix(&job_id)));
    }
}
