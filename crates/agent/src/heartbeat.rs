// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodically refreshes this worker's registry lease so it isn't
//! declared expired while still alive.

use crate::env;
use fleet_core::{Clock, SanitizedHostname};
use fleet_storage::Registry;
use fleet_wire::MessageBus;
use tokio_util::sync::CancellationToken;

pub async fn run<C: Clock>(bus: &dyn MessageBus, clock: &C, sanitized: &SanitizedHostname, shutdown: CancellationToken) {
    let interval = env::heartbeat_interval_ms();
    let registry = Registry::new(bus);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => return,
        }

        if let Err(err) = registry.heartbeat(sanitized, clock).await {
            tracing::warn!(sanitized = %sanitized, error = %err, "heartbeat failed");
        }
    }
}
