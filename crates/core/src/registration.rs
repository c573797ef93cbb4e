// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry entries: leased, heartbeat-refreshed records.

use crate::clock::Clock;
use crate::hostname::{sanitize, Hostname, SanitizedHostname};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A live worker's registration, refreshed by heartbeat and expiring after
/// `ttl_ms` of silence. The registry key is the sanitized hostname; the
/// original hostname is retained so collisions can be detected and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub hostname: Hostname,
    pub sanitized: SanitizedHostname,
    pub labels: BTreeMap<String, String>,
    pub registered_at_ms: u64,
    pub last_heartbeat_ms: u64,
    pub ttl_ms: u64,
}

impl WorkerRegistration {
    /// Default heartbeat TTL: three missed heartbeats at the default 10s
    /// interval before a worker is considered gone.
    pub const DEFAULT_TTL_MS: u64 = 30_000;

    pub fn new(clock: &impl Clock, hostname: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        let hostname = Hostname::new(hostname);
        let sanitized = sanitize(hostname.as_str());
        let now = clock.epoch_ms();
        Self { hostname, sanitized, labels, registered_at_ms: now, last_heartbeat_ms: now, ttl_ms: Self::DEFAULT_TTL_MS }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn heartbeat(&mut self, clock: &impl Clock) {
        self.last_heartbeat_ms = clock.epoch_ms();
    }

    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        clock.epoch_ms().saturating_sub(self.last_heartbeat_ms) > self.ttl_ms
    }

    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).map(String::as_str) == Some(value)
    }

    pub fn registry_key(&self) -> String {
        self.sanitized.registry_key()
    }
}
