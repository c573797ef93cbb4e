// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable consumer configuration and delivery envelopes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether a consumer must explicitly ack each delivery before it is
/// considered processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckPolicy {
    /// Caller must call [`crate::MessageBus::ack`]; an un-acked message is
    /// redelivered after its backoff interval elapses.
    Explicit,
    /// Delivery alone counts as processed; no redelivery ever occurs.
    None,
}

/// Default exponential-ish backoff schedule between redelivery attempts.
/// The last entry repeats for any attempt beyond the schedule's length.
pub fn default_backoff() -> Vec<Duration> {
    vec![Duration::from_secs(1), Duration::from_secs(5), Duration::from_secs(30), Duration::from_secs(120)]
}

/// Configuration for a durable consumer bound to a subject filter.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Subject filter, e.g. `jobs.modify._any.>`. May end in `>` to match
    /// any number of trailing tokens.
    pub filter_subject: String,
    /// Workers sharing a queue group compete for deliveries instead of each
    /// receiving a copy; `None` means this consumer gets every matching
    /// message (used for `_all`/label broadcast consumers).
    pub queue_group: Option<String>,
    pub ack_policy: AckPolicy,
    /// Maximum delivery attempts before a message is dropped as
    /// unprocessable; `0` means unlimited.
    pub max_deliver: u32,
    pub backoff: Vec<Duration>,
}

impl ConsumerConfig {
    pub fn new(filter_subject: impl Into<String>) -> Self {
        Self {
            filter_subject: filter_subject.into(),
            queue_group: None,
            ack_policy: AckPolicy::Explicit,
            max_deliver: 5,
            backoff: default_backoff(),
        }
    }

    pub fn queue_group(mut self, group: impl Into<String>) -> Self {
        self.queue_group = Some(group.into());
        self
    }

    pub fn max_deliver(mut self, n: u32) -> Self {
        self.max_deliver = n;
        self
    }

    pub fn backoff(mut self, schedule: Vec<Duration>) -> Self {
        self.backoff = schedule;
        self
    }

    /// The backoff interval before the `attempt`-th redelivery (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let idx = (attempt.saturating_sub(1) as usize).min(self.backoff.len().saturating_sub(1));
        self.backoff.get(idx).copied().unwrap_or(Duration::ZERO)
    }
}

/// A delivered message, handed back from [`crate::MessageBus::consume`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Monotonic sequence assigned at publish time; stable across redeliveries.
    pub sequence: u64,
    pub subject: String,
    pub payload: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_count: u32,
}

/// Match a concrete subject against a filter that may end in a `>`
/// wildcard, matching NATS subject-matching semantics used throughout the
/// namespace (e.g. `jobs.modify._any.>` matches `jobs.modify._any.command.exec.execute`).
pub fn subject_matches(filter: &str, subject: &str) -> bool {
    let filter_tokens: Vec<&str> = filter.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    for (i, token) in filter_tokens.iter().enumerate() {
        if *token == ">" {
            return i < subject_tokens.len();
        }
        match subject_tokens.get(i) {
            Some(actual) if token == actual || *token == "*" => continue,
            _ => return false,
        }
    }
    filter_tokens.len() == subject_tokens.len()
}
