// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consumer fabric: every worker binds at least three durable
//! consumers — a queue-group `_any` consumer shared fleet-wide, a
//! broadcast `_all` consumer, and a direct consumer at its own sanitized
//! hostname — plus one broadcast consumer per registered label (bounded to
//! two, matching the registry's own label cardinality limit).

use fleet_core::Mode;
use fleet_wire::{ConsumerConfig, MessageBus, WireError};
use std::collections::BTreeMap;

pub const MAX_LABEL_CONSUMERS: usize = 2;

/// Consumer name a worker binds for the fleet-wide `_any` queue group, for `mode`.
pub fn any_consumer_name(mode: Mode) -> String {
    format!("any.{mode}")
}

fn worker_consumer_name(sanitized_host: &str, mode: Mode, suffix: &str) -> String {
    format!("{sanitized_host}.{mode}.{suffix}")
}

/// Create every consumer this worker needs and return their names, ready
/// to be polled in a round-robin loop.
pub async fn subscribe(
    bus: &dyn MessageBus,
    sanitized_host: &str,
    labels: &BTreeMap<String, String>,
    max_deliver: u32,
) -> Result<Vec<String>, WireError> {
    let mut names = Vec::new();

    for mode in [Mode::Query, Mode::Modify] {
        let any_name = any_consumer_name(mode);
        bus.create_or_update_consumer(
            &any_name,
            ConsumerConfig::new(fleet_core::Subject::any_filter(mode)).queue_group("fleet-any").max_deliver(max_deliver),
        )
        .await?;
        names.push(any_name);

        let all_name = worker_consumer_name(sanitized_host, mode, "all");
        bus.create_or_update_consumer(&all_name, ConsumerConfig::new(fleet_core::Subject::all_filter(mode)).max_deliver(max_deliver)).await?;
        names.push(all_name);

        let direct_name = worker_consumer_name(sanitized_host, mode, "direct");
        bus.create_or_update_consumer(&direct_name, ConsumerConfig::new(fleet_core::Subject::direct_filter(mode, sanitized_host)).max_deliver(max_deliver))
            .await?;
        names.push(direct_name);

        for (key, value) in labels.iter().take(MAX_LABEL_CONSUMERS) {
            let label_name = worker_consumer_name(sanitized_host, mode, &format!("label.{key}"));
            bus.create_or_update_consumer(&label_name, ConsumerConfig::new(fleet_core::Subject::label_filter(mode, key, value)).max_deliver(max_deliver))
                .await?;
            names.push(label_name);
        }
    }

    Ok(names)
}
