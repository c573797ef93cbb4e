// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One polling loop per bound consumer: pull deliveries, hand each to the
//! processor, repeat until shutdown is signalled.

use crate::env;
use fleet_core::Clock;
use fleet_engine::WorkerProcessor;
use fleet_wire::MessageBus;
use tokio_util::sync::CancellationToken;

const BATCH_SIZE: usize = 10;

pub async fn run_consumer_loop<C: Clock>(bus: &dyn MessageBus, consumer: &str, processor: &WorkerProcessor<C>, shutdown: CancellationToken) {
    let poll_interval = env::poll_interval_ms();
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let deliveries = tokio::select! {
            result = bus.consume(consumer, BATCH_SIZE) => result,
            _ = shutdown.cancelled() => return,
        };

        match deliveries {
            Ok(deliveries) if deliveries.is_empty() => {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown.cancelled() => return,
                }
            }
            Ok(deliveries) => {
                for delivery in deliveries {
                    if let Err(err) = processor.process(consumer, &delivery).await {
                        tracing::error!(consumer, sequence = delivery.sequence, error = %err, "failed to process delivery");
                    }
                }
            }
            Err(err) => {
                tracing::error!(consumer, error = %err, "consume failed");
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown.cancelled() => return,
                }
            }
        }
    }
}
