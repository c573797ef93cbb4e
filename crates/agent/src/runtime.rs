// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the consumer fabric, heartbeat task, and worker processing loops
//! together into one running agent, with a graceful, drain-then-exit
//! shutdown sequence.

use crate::{env, fabric};
use fleet_core::{Clock, SanitizedHostname, WorkerRegistration};
use fleet_engine::{ProviderDispatch, WorkerProcessor};
use fleet_providers::NodeProviderFactory;
use fleet_storage::Registry;
use fleet_wire::MessageBus;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AgentRuntime<C: Clock> {
    bus: Arc<dyn MessageBus>,
    clock: C,
    sanitized_host: SanitizedHostname,
    labels: BTreeMap<String, String>,
    shutdown: CancellationToken,
}

impl<C: Clock> AgentRuntime<C> {
    pub async fn register_and_build(bus: Arc<dyn MessageBus>, clock: C, hostname: String, labels: BTreeMap<String, String>) -> Result<Self, fleet_storage::StorageError> {
        let reg = WorkerRegistration::new(&clock, &hostname, labels.clone()).with_ttl_ms(env::registration_ttl_ms());
        let sanitized = reg.sanitized.clone();
        Registry::new(bus.as_ref()).register(&reg).await?;
        tracing::info!(hostname = %hostname, sanitized = %sanitized, "worker registered");
        Ok(Self { bus, clock, sanitized_host: sanitized, labels, shutdown: CancellationToken::new() })
    }

    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the agent until `self.shutdown` is cancelled, then drain
    /// in-flight work for up to [`env::drain_timeout`] before returning.
    pub async fn run(self) -> Result<(), fleet_wire::WireError> {
        let consumers = fabric::subscribe(self.bus.as_ref(), self.sanitized_host.as_str(), &self.labels, env::max_deliver()).await?;

        let processor = Arc::new(WorkerProcessor::new(
            self.bus.clone(),
            ProviderDispatch::new(NodeProviderFactory::for_platform()),
            self.clock.clone(),
            self.sanitized_host.as_str(),
        ));

        let mut handles = Vec::new();
        for consumer in consumers {
            let bus = self.bus.clone();
            let processor = processor.clone();
            let shutdown = self.shutdown.clone();
            handles.push(tokio::spawn(async move {
                crate::worker::run_consumer_loop(bus.as_ref(), &consumer, processor.as_ref(), shutdown).await;
            }));
        }

        let heartbeat = {
            let bus = self.bus.clone();
            let clock = self.clock.clone();
            let sanitized = self.sanitized_host.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { crate::heartbeat::run(bus.as_ref(), &clock, &sanitized, shutdown).await })
        };

        self.shutdown.cancelled().await;
        tracing::info!("shutdown requested, draining in-flight work");
        let drain = tokio::time::timeout(env::drain_timeout(), futures_join_all(handles));
        if drain.await.is_err() {
            tracing::warn!("drain timeout elapsed before all worker loops exited");
        }
        let _ = heartbeat.await;
        Registry::new(self.bus.as_ref()).deregister(&self.sanitized_host).await.ok();
        Ok(())
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}
