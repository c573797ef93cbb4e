// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios exercising the dispatch plane through its public
//! surface: a job submitted via [`Dispatcher`], picked up by one or more
//! [`WorkerProcessor`]s bound to [`InProcessBus`] consumers, and observed
//! through the storage layer's job/event/response records.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_core::{Changed, Clock, EventKind, FakeClock, Mode, Subject, TargetSelector, WorkerRegistration};
use fleet_dispatch::{Dispatcher, DispatchError};
use fleet_engine::{ProviderDispatch, WorkerProcessor};
use fleet_providers::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, NodeProvider, OsInfo, PingResult, ProviderError};
use fleet_storage::{EventLog, Registry, ResponseStore};
use fleet_wire::{ConsumerConfig, InProcessBus, MessageBus};
use serde_json::json;

struct ScriptedProvider {
    exec_outcome: Box<dyn Fn() -> Result<CommandOutput, ProviderError> + Send + Sync>,
}

#[async_trait]
impl NodeProvider for ScriptedProvider {
    async fn exec(&self, _command: &str, _args: &[String], _cwd: Option<&str>, _timeout: std::time::Duration) -> Result<CommandOutput, ProviderError> {
        (self.exec_outcome)()
    }

    async fn shell(&self, _command: &str, _cwd: Option<&str>, _timeout: std::time::Duration) -> Result<CommandOutput, ProviderError> {
        (self.exec_outcome)()
    }

    async fn hostname(&self) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported("hostname".to_string()))
    }

    async fn uptime(&self) -> Result<std::time::Duration, ProviderError> {
        Err(ProviderError::Unsupported("uptime".to_string()))
    }

    async fn os_info(&self) -> Result<OsInfo, ProviderError> {
        Err(ProviderError::Unsupported("os_info".to_string()))
    }

    async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError> {
        Err(ProviderError::Unsupported("disk_usage".to_string()))
    }

    async fn memory(&self) -> Result<MemoryInfo, ProviderError> {
        Err(ProviderError::Unsupported("memory".to_string()))
    }

    async fn load_averages(&self) -> Result<LoadAverages, ProviderError> {
        Err(ProviderError::Unsupported("load_averages".to_string()))
    }

    async fn ping(&self, _address: &str, _count: u32) -> Result<PingResult, ProviderError> {
        Err(ProviderError::Unsupported("ping".to_string()))
    }

    async fn dns_get(&self, _iface: &str) -> Result<DnsConfig, ProviderError> {
        Err(ProviderError::Unsupported("dns_get".to_string()))
    }

    async fn dns_update(&self, _servers: &[String], _searches: &[String], _iface: &str) -> Result<bool, ProviderError> {
        Err(ProviderError::Unsupported("dns_update".to_string()))
    }
}

fn always_ok(stdout: &'static str) -> ScriptedProvider {
    ScriptedProvider { exec_outcome: Box::new(move || Ok(CommandOutput { exit_code: 0, stdout: stdout.to_string(), stderr: String::new(), duration_ms: 5 })) }
}

fn always_fails(message: &'static str) -> ScriptedProvider {
    ScriptedProvider { exec_outcome: Box::new(move || Ok(CommandOutput { exit_code: 1, stdout: String::new(), stderr: message.to_string(), duration_ms: 5 })) }
}

/// Register `hostname` and bind a direct + `_all` consumer for `mode`.
/// Returns the registration and the bound consumer names.
async fn register_worker(bus: &Arc<dyn MessageBus>, clock: &FakeClock, hostname: &str, mode: Mode) -> (WorkerRegistration, Vec<String>) {
    let reg = WorkerRegistration::new(clock, hostname, BTreeMap::new());
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();

    let direct = format!("{}.{mode}.direct", reg.sanitized);
    bus.create_or_update_consumer(&direct, ConsumerConfig::new(Subject::direct_filter(mode, reg.sanitized.as_str()))).await.unwrap();

    let all = format!("{}.{mode}.all", reg.sanitized);
    bus.create_or_update_consumer(&all, ConsumerConfig::new(Subject::all_filter(mode))).await.unwrap();

    (reg, vec![direct, all])
}

async fn drain_once(bus: &Arc<dyn MessageBus>, processor: &WorkerProcessor<FakeClock>, consumer: &str) {
    for delivery in bus.consume(consumer, 10).await.unwrap() {
        processor.process(consumer, &delivery).await.unwrap();
    }
}

#[tokio::test]
async fn unicast_command_exec_success() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let reg = WorkerRegistration::new(&clock, "worker1", BTreeMap::new());
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();
    let consumer = format!("{}.modify.direct", reg.sanitized);
    bus.create_or_update_consumer(&consumer, ConsumerConfig::new(Subject::direct_filter(Mode::Modify, reg.sanitized.as_str()))).await.unwrap();
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("file1\nfile2"))), clock.clone(), reg.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher
        .submit(Mode::Modify, "command", "exec.execute", json!({"command": "ls", "args": ["-la"]}), TargetSelector::Host(reg.sanitized.as_str().to_string()))
        .await
        .unwrap();
    assert_eq!(submitted.expected_responses, 1);

    drain_once(&bus, &processor, &consumer).await;

    let responses = ResponseStore::new(bus.as_ref()).list_for_job(&submitted.job.id).await.unwrap();
    assert_eq!(responses.len(), 1);
    let response = &responses[0];
    assert!(response.ok);
    assert_eq!(response.changed, Changed::Yes);
    assert_eq!(response.data["stdout"], "file1\nfile2");
    assert_eq!(response.data["exit_code"], 0);
}

#[tokio::test]
async fn missing_required_param_surfaces_as_a_failed_response_not_a_crash() {
    // No HTTP edge validates params before a job is created (none is
    // implemented); the worker's dispatch layer is where `command` is
    // required, and a missing one is reported as a normal Failed response.
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let (reg, consumers) = register_worker(&bus, &clock, "worker1", Mode::Modify).await;
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("unused"))), clock.clone(), reg.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher.submit(Mode::Modify, "command", "shell.execute", json!({}), TargetSelector::Host(reg.sanitized.as_str().to_string())).await.unwrap();

    drain_once(&bus, &processor, &consumers[0]).await;

    let response = ResponseStore::new(bus.as_ref()).get(&submitted.job.id, reg.sanitized.as_str()).await.unwrap().unwrap();
    assert!(!response.ok);
    assert!(response.error.unwrap().contains("command"));
}

#[tokio::test]
async fn dispatch_to_an_unregistered_host_fails_fast() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));
    let dispatcher = Dispatcher::new(bus, clock);

    let err = dispatcher.submit(Mode::Modify, "command", "exec.execute", json!({"command": "ls"}), TargetSelector::Host("nonexistent".to_string())).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTarget(ref target) if target == "nonexistent"));
}

#[tokio::test]
async fn broadcast_reports_a_distinct_result_per_worker_including_failures() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let (reg1, _) = register_worker(&bus, &clock, "server1", Mode::Modify).await;
    let proc1 = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("output1"))), clock.clone(), reg1.sanitized.as_str());
    let (reg2, _) = register_worker(&bus, &clock, "server2", Mode::Modify).await;
    let proc2 = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_fails("command not found"))), clock.clone(), reg2.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher.submit(Mode::Modify, "command", "exec.execute", json!({"command": "ls", "args": ["-la"]}), TargetSelector::All).await.unwrap();
    assert_eq!(submitted.expected_responses, 2);

    let all1 = format!("{}.modify.all", reg1.sanitized);
    let all2 = format!("{}.modify.all", reg2.sanitized);
    drain_once(&bus, &proc1, &all1).await;
    drain_once(&bus, &proc2, &all2).await;

    let responses = ResponseStore::new(bus.as_ref()).list_for_job(&submitted.job.id).await.unwrap();
    assert_eq!(responses.len(), 2);
    let server1 = responses.iter().find(|r| r.worker == reg1.sanitized.as_str()).unwrap();
    assert!(server1.ok);
    assert_eq!(server1.data["stdout"], "output1");
    let server2 = responses.iter().find(|r| r.worker == reg2.sanitized.as_str()).unwrap();
    assert!(!server2.ok);
    assert_eq!(server2.error.as_deref(), Some("exit code 1: command not found"));
}

#[tokio::test]
async fn expired_worker_is_excluded_from_a_subsequent_broadcast() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let reg = WorkerRegistration::new(&clock, "web-01", BTreeMap::new()).with_ttl_ms(1_000);
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();
    assert!(Registry::new(bus.as_ref()).get(&reg.sanitized).await.unwrap().is_some());

    clock.advance(Duration::from_millis(1_001));

    let live = Registry::new(bus.as_ref()).list_live(&clock).await.unwrap();
    assert!(live.is_empty());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher.submit(Mode::Query, "node", "hostname.get", serde_json::Value::Null, TargetSelector::All).await.unwrap();
    assert_eq!(submitted.expected_responses, 0);
}

#[tokio::test]
async fn a_crash_before_ack_is_redelivered_and_completes_on_retry() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let reg = WorkerRegistration::new(&clock, "web-01", BTreeMap::new());
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();
    let consumer = format!("{}.modify.direct", reg.sanitized);
    bus.create_or_update_consumer(&consumer, ConsumerConfig::new(Subject::direct_filter(Mode::Modify, reg.sanitized.as_str())).max_deliver(5)).await.unwrap();

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher
        .submit(Mode::Modify, "command", "exec.execute", json!({"command": "ls"}), TargetSelector::Host(reg.sanitized.as_str().to_string()))
        .await
        .unwrap();

    // First attempt: the worker reaches Started and then crashes before
    // writing a response or acking.
    let first = bus.consume(&consumer, 10).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].delivery_count, 1);
    let events = EventLog::new(bus.as_ref());
    events.append(&fleet_core::StatusEvent::new(&clock, submitted.job.id, 1, EventKind::Acknowledged, reg.sanitized.as_str())).await.unwrap();
    events.append(&fleet_core::StatusEvent::new(&clock, submitted.job.id, 2, EventKind::Started, reg.sanitized.as_str())).await.unwrap();
    bus.nack(&consumer, first[0].sequence).await.unwrap();

    // Redelivery: the worker processes it for real this time.
    let second = bus.consume(&consumer, 10).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].delivery_count, 2);
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("file1"))), clock.clone(), reg.sanitized.as_str());
    processor.process(&consumer, &second[0]).await.unwrap();

    let history = events.list(&submitted.job.id).await.unwrap();
    assert_eq!(history.iter().filter(|e| e.kind == EventKind::Acknowledged).count(), 1);
    assert_eq!(history.iter().filter(|e| e.kind == EventKind::Started).count(), 1);
    assert_eq!(history.iter().filter(|e| e.kind == EventKind::Completed).count(), 1);

    let response = ResponseStore::new(bus.as_ref()).get(&submitted.job.id, reg.sanitized.as_str()).await.unwrap().unwrap();
    assert!(response.ok);
    assert_eq!(response.data["stdout"], "file1");
}

#[tokio::test]
async fn retryable_failure_is_left_unacked_for_redelivery() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let reg = WorkerRegistration::new(&clock, "worker1", BTreeMap::new());
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();
    let consumer = format!("{}.modify.direct", reg.sanitized);
    bus.create_or_update_consumer(&consumer, ConsumerConfig::new(Subject::direct_filter(Mode::Modify, reg.sanitized.as_str())).max_deliver(5))
        .await
        .unwrap();
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_fails("connection refused"))), clock.clone(), reg.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher
        .submit(Mode::Modify, "command", "exec.execute", json!({"command": "ls"}), TargetSelector::Host(reg.sanitized.as_str().to_string()))
        .await
        .unwrap();

    let first = bus.consume(&consumer, 10).await.unwrap();
    assert_eq!(first.len(), 1);
    processor.process(&consumer, &first[0]).await.unwrap();

    // The provider failure is retryable, so the delivery was never acked:
    // it becomes due again once its backoff window elapses, without a
    // test-driven `nack`.
    clock.advance(Duration::from_secs(60));
    let redelivered = bus.consume(&consumer, 10).await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].delivery_count, 2);

    let response = ResponseStore::new(bus.as_ref()).get(&submitted.job.id, reg.sanitized.as_str()).await.unwrap().unwrap();
    assert!(!response.ok);
}

#[tokio::test]
async fn unsupported_operation_is_a_terminal_failure_and_is_acked() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let (reg, consumers) = register_worker(&bus, &clock, "worker1", Mode::Modify).await;
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("unused"))), clock.clone(), reg.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher
        .submit(Mode::Modify, "widget", "spin.fast", json!({}), TargetSelector::Host(reg.sanitized.as_str().to_string()))
        .await
        .unwrap();

    let deliveries = bus.consume(&consumers[0], 10).await.unwrap();
    processor.process(&consumers[0], &deliveries[0]).await.unwrap();

    // Acked immediately: no amount of redelivery will make an unknown
    // operation succeed.
    let err = bus.ack(&consumers[0], deliveries[0].sequence).await.unwrap_err();
    assert!(matches!(err, fleet_wire::WireError::UnknownDelivery(..)));

    let response = ResponseStore::new(bus.as_ref()).get(&submitted.job.id, reg.sanitized.as_str()).await.unwrap().unwrap();
    assert!(!response.ok);
}

#[tokio::test]
async fn job_bytes_are_stable_once_written() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));
    let reg = WorkerRegistration::new(&clock, "worker1", BTreeMap::new());
    Registry::new(bus.as_ref()).register(&reg).await.unwrap();
    bus.create_or_update_consumer("w1.query.direct", ConsumerConfig::new(Subject::direct_filter(Mode::Query, reg.sanitized.as_str()))).await.unwrap();

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher
        .submit(Mode::Query, "node", "hostname.get", serde_json::Value::Null, TargetSelector::Host(reg.sanitized.as_str().to_string()))
        .await
        .unwrap();

    let reread = fleet_storage::JobStore::new(bus.as_ref()).require(&submitted.job.id).await.unwrap();
    assert_eq!(reread, submitted.job);
}

#[tokio::test]
async fn duplicate_hostnames_with_distinct_originals_are_rejected() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));
    let registry = Registry::new(bus.as_ref());

    registry.register(&WorkerRegistration::new(&clock, "Johns-MacBook-Pro.local", BTreeMap::new())).await.unwrap();
    let collision = registry.register(&WorkerRegistration::new(&clock, "web-01", BTreeMap::new())).await;
    assert!(collision.is_ok(), "distinct sanitized keys must not collide");

    let err = registry.register(&WorkerRegistration::new(&clock, "web.01", BTreeMap::new())).await.unwrap_err();
    assert!(matches!(err, fleet_storage::StorageError::HostnameCollision { .. }));
}

#[tokio::test]
async fn exec_params_round_trip_changed_true_for_modify_operations() {
    let clock = FakeClock::new();
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::with_clock(clock.clone()));

    let (reg, consumers) = register_worker(&bus, &clock, "worker1", Mode::Modify).await;
    let processor = WorkerProcessor::new(bus.clone(), ProviderDispatch::new(Box::new(always_ok("done"))), clock.clone(), reg.sanitized.as_str());

    let dispatcher = Dispatcher::new(bus.clone(), clock.clone());
    let submitted = dispatcher.submit(Mode::Modify, "command", "exec.execute", json!({"command": "true"}), TargetSelector::Host(reg.sanitized.as_str().to_string())).await.unwrap();
    drain_once(&bus, &processor, &consumers[0]).await;

    let response = ResponseStore::new(bus.as_ref()).get(&submitted.job.id, reg.sanitized.as_str()).await.unwrap().unwrap();
    assert_eq!(response.changed, Changed::Yes);
}
