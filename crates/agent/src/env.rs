// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent binary.

use std::collections::BTreeMap;
use std::time::Duration;

/// Override the hostname the agent registers under instead of asking the
/// node provider. Useful in containers where the provider's hostname
/// source disagrees with the name the rest of the fleet should see.
pub fn hostname_override() -> Option<String> {
    std::env::var("OJAGENT_HOSTNAME").ok().filter(|s| !s.is_empty())
}

/// Static labels this worker registers with, as `key=value` pairs
/// separated by commas, e.g. `OJAGENT_LABELS=env=prod,rack=3`.
pub fn labels() -> BTreeMap<String, String> {
    std::env::var("OJAGENT_LABELS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// How often the agent refreshes its registry heartbeat.
pub fn heartbeat_interval_ms() -> Duration {
    std::env::var("OJAGENT_HEARTBEAT_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Registry lease TTL; a worker silent for longer than this is considered gone.
pub fn registration_ttl_ms() -> u64 {
    std::env::var("OJAGENT_REGISTRATION_TTL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(30_000)
}

/// Interval between `consume` polls on each subscription.
pub fn poll_interval_ms() -> Duration {
    std::env::var("OJAGENT_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(250))
}

/// Maximum redelivery attempts before a message is dropped.
pub fn max_deliver() -> u32 {
    std::env::var("OJAGENT_MAX_DELIVER").ok().and_then(|s| s.parse().ok()).unwrap_or(5)
}

/// How long graceful shutdown waits for in-flight jobs to finish before
/// the process exits anyway.
pub fn drain_timeout() -> Duration {
    std::env::var("OJAGENT_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
