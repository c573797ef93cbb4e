// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker-side job processing algorithm: turn one delivered message
//! into an acknowledged/started/terminal event sequence plus a response,
//! resuming cleanly if a crash caused the same delivery to arrive twice.

use crate::dispatch::ProviderDispatch;
use crate::error::EngineError;
use fleet_core::{Clock, EventKind, Job, Response, StatusEvent};
use fleet_storage::{EventLog, JobStore, ResponseStore};
use fleet_wire::{Delivery, MessageBus};
use std::sync::Arc;

pub struct WorkerProcessor<C: Clock> {
    bus: Arc<dyn MessageBus>,
    dispatch: ProviderDispatch,
    clock: C,
    /// This worker's sanitized hostname, stamped onto every event/response it emits.
    worker: String,
}

impl<C: Clock> WorkerProcessor<C> {
    pub fn new(bus: Arc<dyn MessageBus>, dispatch: ProviderDispatch, clock: C, worker: impl Into<String>) -> Self {
        Self { bus, dispatch, clock, worker: worker.into() }
    }

    /// Process one delivery end to end. Steps:
    ///
    /// 1. Deserialize the `Job` from the delivery payload.
    /// 2. Persist the job if this worker hasn't seen it yet (defensive;
    ///    normally the dispatcher already wrote it before publishing).
    /// 3. If the job's event log is already terminal, this is a
    ///    redelivered duplicate of a job we finished — ack and stop.
    /// 4. Append `Acknowledged` (sequence 1) unless already present.
    /// 5. Append `Started` (sequence 2) unless already present.
    /// 6. Run the job through [`ProviderDispatch`].
    /// 7. Record the response and the terminal `Completed`/`Failed` event,
    ///    each carrying the dispatch's elapsed `duration_ms`.
    /// 8. Ack the delivery only for a success or a [`DispatchFailure::Terminal`]
    ///    outcome. A [`DispatchFailure::Retryable`] one is left unacked so
    ///    the consumer fabric redelivers it, up to the consumer's
    ///    `max_deliver`.
    pub async fn process(&self, consumer: &str, delivery: &Delivery) -> Result<(), EngineError> {
        let job: Job = serde_json::from_slice(&delivery.payload)?;
        let jobs = JobStore::new(self.bus.as_ref());
        let events = EventLog::new(self.bus.as_ref());
        let responses = ResponseStore::new(self.bus.as_ref());

        if jobs.get(&job.id).await?.is_none() {
            jobs.put(&job).await?;
        }

        let history = events.list(&job.id).await?;
        if history.last().is_some_and(|e| e.kind.is_terminal()) {
            tracing::debug!(job_id = %job.id, "duplicate delivery of an already-finished job, acking without reprocessing");
            self.bus.ack(consumer, delivery.sequence).await?;
            return Ok(());
        }

        if history.is_empty() {
            events.append(&StatusEvent::new(&self.clock, job.id, 1, EventKind::Acknowledged, &self.worker)).await?;
        }
        if history.len() < 2 {
            events.append(&StatusEvent::new(&self.clock, job.id, 2, EventKind::Started, &self.worker)).await?;
        }

        let started_at_ms = self.clock.epoch_ms();
        let outcome = self.dispatch.run(&job).await;
        let duration_ms = self.clock.epoch_ms().saturating_sub(started_at_ms);

        let should_ack = match outcome {
            Ok((changed, data)) => {
                responses.put(&Response::success(&self.clock, job.id, &self.worker, changed, data)).await?;
                events.append(&StatusEvent::new(&self.clock, job.id, 3, EventKind::Completed, &self.worker).with_duration_ms(duration_ms)).await?;
                true
            }
            Err(error) => {
                responses.put(&Response::failure(&self.clock, job.id, &self.worker, error.message())).await?;
                events
                    .append(&StatusEvent::failed(&self.clock, job.id, 3, &self.worker, error.message()).with_duration_ms(duration_ms))
                    .await?;
                error.is_terminal()
            }
        };

        if should_ack {
            self.bus.ack(consumer, delivery.sequence).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{FakeClock, Mode, Subject, TargetSelector};
    use fleet_providers::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, NodeProvider, OsInfo, PingResult, ProviderError};
    use fleet_wire::{ConsumerConfig, InProcessBus};
    use std::time::Duration;

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl NodeProvider for AlwaysOk {
        async fn exec(&self, _command: &str, _args: &[String], _cwd: Option<&str>, _timeout: Duration) -> Result<CommandOutput, ProviderError> {
            Ok(CommandOutput { exit_code: 0, stdout: String::new(), stderr: String::new(), duration_ms: 0 })
        }
        async fn shell(&self, _command: &str, _cwd: Option<&str>, _timeout: Duration) -> Result<CommandOutput, ProviderError> {
            Ok(CommandOutput { exit_code: 0, stdout: String::new(), stderr: String::new(), duration_ms: 0 })
        }
        async fn hostname(&self) -> Result<String, ProviderError> {
            Ok("web-01".to_string())
        }
        async fn uptime(&self) -> Result<Duration, ProviderError> {
            Ok(Duration::from_secs(1))
        }
        async fn os_info(&self) -> Result<OsInfo, ProviderError> {
            Ok(OsInfo { family: "linux".to_string(), name: "Ubuntu".to_string(), version: "22.04".to_string(), arch: "x86_64".to_string() })
        }
        async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError> {
            Ok(vec![])
        }
        async fn memory(&self) -> Result<MemoryInfo, ProviderError> {
            Ok(MemoryInfo { total_bytes: 0, used_bytes: 0, available_bytes: 0 })
        }
        async fn load_averages(&self) -> Result<LoadAverages, ProviderError> {
            Ok(LoadAverages { one: 0.0, five: 0.0, fifteen: 0.0 })
        }
        async fn ping(&self, address: &str, count: u32) -> Result<PingResult, ProviderError> {
            Ok(PingResult { host: address.to_string(), transmitted: count, received: count, packet_loss_pct: 0.0 })
        }
        async fn dns_get(&self, iface: &str) -> Result<DnsConfig, ProviderError> {
            Ok(DnsConfig { interface: iface.to_string(), servers: vec![], searches: vec![] })
        }
        async fn dns_update(&self, _servers: &[String], _searches: &[String], _iface: &str) -> Result<bool, ProviderError> {
            Ok(false)
        }
    }

    async fn setup() -> (Arc<InProcessBus<FakeClock>>, WorkerProcessor<FakeClock>) {
        let clock = FakeClock::new();
        let bus = Arc::new(InProcessBus::with_clock(clock.clone()));
        bus.create_or_update_consumer("w1", ConsumerConfig::new("jobs.modify._any.>")).await.unwrap();
        let dispatch = ProviderDispatch::new(Box::new(AlwaysOk));
        let processor = WorkerProcessor::new(bus.clone(), dispatch, clock, "web_01");
        (bus, processor)
    }

    #[tokio::test]
    async fn processes_a_job_end_to_end() {
        let (bus, processor) = setup().await;
        let clock = FakeClock::new();
        let subject = Subject::new(Mode::Modify, TargetSelector::Any, "node", "hostname.get");
        let job = Job::new(&clock, &subject, serde_json::Value::Null);
        bus.publish(&subject.to_subject_string(), serde_json::to_vec(&job).unwrap()).await.unwrap();

        let deliveries = bus.consume("w1", 1).await.unwrap();
        processor.process("w1", &deliveries[0]).await.unwrap();

        let events = EventLog::new(bus.as_ref()).list(&job.id).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().kind, EventKind::Completed);

        let response = ResponseStore::new(bus.as_ref()).get(&job.id, "web_01").await.unwrap().unwrap();
        assert!(response.ok);
    }

    #[tokio::test]
    async fn redelivered_duplicate_of_a_finished_job_is_a_no_op() {
        let (bus, processor) = setup().await;
        let clock = FakeClock::new();
        let subject = Subject::new(Mode::Modify, TargetSelector::Any, "node", "hostname.get");
        let job = Job::new(&clock, &subject, serde_json::Value::Null);
        bus.publish(&subject.to_subject_string(), serde_json::to_vec(&job).unwrap()).await.unwrap();

        let first = bus.consume("w1", 1).await.unwrap();

        // Simulate a worker that finished the job (events + response recorded)
        // but crashed before acking, so the bus still considers it pending.
        let events = EventLog::new(bus.as_ref());
        events.append(&StatusEvent::new(&clock, job.id, 1, EventKind::Acknowledged, "web_01")).await.unwrap();
        events.append(&StatusEvent::new(&clock, job.id, 2, EventKind::Started, "web_01")).await.unwrap();
        events.append(&StatusEvent::new(&clock, job.id, 3, EventKind::Completed, "web_01")).await.unwrap();

        bus.nack("w1", first[0].sequence).await.unwrap();
        let redelivered = bus.consume("w1", 1).await.unwrap();
        assert_eq!(redelivered[0].delivery_count, 2);

        processor.process("w1", &redelivered[0]).await.unwrap();

        assert_eq!(events.list(&job.id).await.unwrap().len(), 3);
    }
}
