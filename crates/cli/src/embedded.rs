// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A local, single-process fleet for exercising the dispatch path without
//! a real message bus deployment. Every embedded worker registers itself
//! and binds the same consumer fabric a standalone `fleet-agent` would,
//! but all share this process's [`InProcessBus`] and exit together when
//! the returned handle is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_core::{Clock, Subject};
use fleet_engine::{ProviderDispatch, WorkerProcessor};
use fleet_providers::NodeProviderFactory;
use fleet_storage::Registry;
use fleet_wire::{ConsumerConfig, MessageBus};
use tokio::task::JoinHandle;

const MAX_DELIVER: u32 = 5;

/// Running embedded workers. Aborts every worker task on drop.
pub struct EmbeddedFleet {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for EmbeddedFleet {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Register `count` synthetic workers (`local-0`, `local-1`, ...) against
/// `bus` and start each one polling its `_any`/`_all`/direct consumers.
pub async fn spawn<C: Clock>(bus: Arc<dyn MessageBus>, clock: C, count: usize) -> anyhow::Result<EmbeddedFleet> {
    let mut handles = Vec::with_capacity(count);

    for index in 0..count {
        let hostname = format!("local-{index}");
        let reg = fleet_core::WorkerRegistration::new(&clock, &hostname, BTreeMap::new());
        let sanitized = reg.sanitized.clone();
        Registry::new(bus.as_ref()).register(&reg).await?;

        let mut consumers = Vec::new();
        for mode in [fleet_core::Mode::Query, fleet_core::Mode::Modify] {
            let any_name = format!("cli-any.{mode}");
            bus.create_or_update_consumer(&any_name, ConsumerConfig::new(Subject::any_filter(mode)).queue_group("fleet-any").max_deliver(MAX_DELIVER)).await?;
            consumers.push(any_name);

            let direct_name = format!("{sanitized}.{mode}.direct");
            bus.create_or_update_consumer(&direct_name, ConsumerConfig::new(Subject::direct_filter(mode, sanitized.as_str())).max_deliver(MAX_DELIVER)).await?;
            consumers.push(direct_name);

            let all_name = format!("{sanitized}.{mode}.all");
            bus.create_or_update_consumer(&all_name, ConsumerConfig::new(Subject::all_filter(mode)).max_deliver(MAX_DELIVER)).await?;
            consumers.push(all_name);
        }

        let processor = Arc::new(WorkerProcessor::new(bus.clone(), ProviderDispatch::new(NodeProviderFactory::for_platform()), clock.clone(), sanitized.as_str()));

        for consumer in consumers {
            let bus = bus.clone();
            let processor = processor.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match bus.consume(&consumer, 10).await {
                        Ok(deliveries) if deliveries.is_empty() => {
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        }
                        Ok(deliveries) => {
                            for delivery in deliveries {
                                let _ = processor.process(&consumer, &delivery).await;
                            }
                        }
                        Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
                    }
                }
            }));
        }
    }

    Ok(EmbeddedFleet { handles })
}
