// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The library-level entry point for submitting jobs: validates the
//! target, writes the immutable job record, publishes it onto the subject
//! the matching worker(s) consume from, and can wait for the resulting
//! responses.

use crate::error::DispatchError;
use crate::resolver::TargetResolver;
use fleet_core::{Clock, Job, JobId, Mode, Response, Subject, TargetSelector};
use fleet_storage::{JobStore, Registry, ResponseStore};
use fleet_wire::MessageBus;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// The outcome of [`Dispatcher::submit`]: the stored job plus how many
/// responses a caller should wait for before considering it complete.
pub struct SubmitResult {
    pub job: Job,
    pub expected_responses: usize,
}

pub struct Dispatcher<C: Clock> {
    bus: Arc<dyn MessageBus>,
    clock: C,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(bus: Arc<dyn MessageBus>, clock: C) -> Self {
        Self { bus, clock }
    }

    /// Resolve `target`, store the job, and publish it. Does not wait for
    /// any worker to process it — see [`Dispatcher::await_responses`].
    pub async fn submit(&self, mode: Mode, category: &str, operation: &str, params: Value, target: TargetSelector) -> Result<SubmitResult, DispatchError> {
        let registry = Registry::new(self.bus.as_ref());
        let resolved = TargetResolver::resolve(&registry, &self.clock, &target).await?;

        let subject = Subject::new(mode, target, category, operation);
        let job = Job::new(&self.clock, &subject, params);

        JobStore::new(self.bus.as_ref()).put(&job).await?;
        self.bus.publish(&subject.to_subject_string(), serde_json::to_vec(&job)?).await?;

        tracing::info!(job_id = %job.id, operation = %subject.operation_type(), expected = resolved.expected_responses, "job submitted");
        Ok(SubmitResult { job, expected_responses: resolved.expected_responses })
    }

    /// Poll for responses to `job_id` until either `expected` have arrived
    /// (the broadcast/unicast early-exit: a job is done once every targeted
    /// worker has answered, regardless of how long the deadline allows) or
    /// `timeout` elapses, whichever comes first. `expected == 0` (a
    /// broadcast with no live workers) returns immediately.
    ///
    /// A deadline expiry is not an error: it returns whatever responses had
    /// arrived so far, short of `expected`. Callers distinguish a timed-out
    /// wait from a complete one by comparing the returned length against
    /// `expected`.
    pub async fn await_responses(&self, job_id: &JobId, expected: usize, timeout: Duration) -> Result<Vec<Response>, DispatchError> {
        let responses = ResponseStore::new(self.bus.as_ref());
        if expected == 0 {
            return Ok(Vec::new());
        }

        let poll = async {
            loop {
                let current = responses.list_for_job(job_id).await?;
                if current.len() >= expected {
                    return Ok(current);
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Ok(responses.list_for_job(job_id).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{Changed, FakeClock, WorkerRegistration};
    use fleet_wire::InProcessBus;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn submit_without_a_live_worker_fails_fast() {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        let dispatcher = Dispatcher::new(bus, clock);

        let err = dispatcher.submit(Mode::Modify, "command", "exec.execute", Value::Null, TargetSelector::Any).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn submit_stores_and_publishes_the_job() {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        Registry::new(bus.as_ref()).register(&WorkerRegistration::new(&clock, "web-01", BTreeMap::new())).await.unwrap();

        let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
        let result = dispatcher
            .submit(Mode::Query, "node", "hostname.get", Value::Null, TargetSelector::Any)
            .await
            .unwrap();
        assert_eq!(result.expected_responses, 1);

        let stored = JobStore::new(bus.as_ref()).require(&result.job.id).await.unwrap();
        assert_eq!(stored.id, result.job.id);
    }

    #[tokio::test]
    async fn broadcast_with_no_live_workers_returns_immediately() {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        let dispatcher = Dispatcher::new(bus, clock);

        let result = dispatcher.submit(Mode::Query, "node", "hostname.get", Value::Null, TargetSelector::All).await.unwrap();
        assert_eq!(result.expected_responses, 0);

        let responses = dispatcher.await_responses(&result.job.id, result.expected_responses, Duration::from_millis(50)).await.unwrap();
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn await_responses_returns_as_soon_as_the_expected_count_arrives() {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        Registry::new(bus.as_ref()).register(&WorkerRegistration::new(&clock, "web-01", BTreeMap::new())).await.unwrap();
        Registry::new(bus.as_ref()).register(&WorkerRegistration::new(&clock, "web-02", BTreeMap::new())).await.unwrap();

        let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
        let result = dispatcher.submit(Mode::Query, "node", "hostname.get", Value::Null, TargetSelector::All).await.unwrap();
        assert_eq!(result.expected_responses, 2);

        let job_id = result.job.id;
        let responses_store = ResponseStore::new(bus.as_ref());
        responses_store.put(&Response::success(&clock, job_id, "web_01", Changed::No, Value::Null)).await.unwrap();
        responses_store.put(&Response::success(&clock, job_id, "web_02", Changed::No, Value::Null)).await.unwrap();

        let responses = dispatcher.await_responses(&job_id, result.expected_responses, Duration::from_secs(1)).await.unwrap();
        assert_eq!(responses.len(), 2);
    }

    #[tokio::test]
    async fn await_responses_times_out_if_short_of_expected() {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        Registry::new(bus.as_ref()).register(&WorkerRegistration::new(&clock, "web-01", BTreeMap::new())).await.unwrap();

        let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
        let result = dispatcher.submit(Mode::Query, "node", "hostname.get", Value::Null, TargetSelector::Any).await.unwrap();

        let partial = dispatcher.await_responses(&result.job.id, result.expected_responses, Duration::from_millis(50)).await.unwrap();
        assert!(partial.len() < result.expected_responses);
    }
}
