// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-process, in-memory [`MessageBus`] used by the bundled binaries and
//! the integration test suite. Durable consumers, queue-group arbitration,
//! bounded redelivery with backoff, and a TTL'd KV store all behave the way
//! a real JetStream-backed deployment would, just without the network.

use crate::bus::MessageBus;
use crate::consumer::{subject_matches, ConsumerConfig, Delivery};
use crate::error::WireError;
use async_trait::async_trait;
use fleet_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

struct StoredMessage {
    sequence: u64,
    subject: String,
    payload: Vec<u8>,
}

struct PendingDelivery {
    subject: String,
    payload: Vec<u8>,
    delivery_count: u32,
    next_attempt_ms: u64,
}

struct ConsumerState {
    config: ConsumerConfig,
    /// Index into `Inner::log` of the next unexamined message, for
    /// non-queue-group consumers. Queue-group consumers instead share a
    /// cursor keyed by group name in `Inner::group_cursors`.
    cursor: usize,
    pending: HashMap<u64, PendingDelivery>,
}

struct KvEntry {
    value: Vec<u8>,
    expires_at_ms: Option<u64>,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    log: Vec<StoredMessage>,
    consumers: HashMap<String, ConsumerState>,
    group_cursors: HashMap<String, usize>,
    kv: HashMap<String, HashMap<String, KvEntry>>,
}

/// Reference [`MessageBus`] implementation backed by an in-process log and
/// KV map, generic over [`Clock`] so tests can control redelivery backoff
/// and KV expiry deterministically.
pub struct InProcessBus<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> InProcessBus<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, inner: Mutex::new(Inner::default()) }
    }
}

impl InProcessBus<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InProcessBus<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

fn cursor_for<'a>(consumer_name: &str, state: &'a mut ConsumerState, group_cursors: &'a mut HashMap<String, usize>) -> &'a mut usize {
    match &state.config.queue_group {
        Some(group) => group_cursors.entry(group.clone()).or_insert(0),
        None => {
            let _ = consumer_name;
            &mut state.cursor
        }
    }
}

#[async_trait]
impl<C: Clock> MessageBus for InProcessBus<C> {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64, WireError> {
        let mut inner = self.inner.lock();
        let sequence = inner.next_seq;
        inner.next_seq += 1;
        inner.log.push(StoredMessage { sequence, subject: subject.to_string(), payload });
        Ok(sequence)
    }

    async fn create_or_update_consumer(&self, name: &str, config: ConsumerConfig) -> Result<(), WireError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.consumers.get(name) {
            if existing.config.filter_subject != config.filter_subject {
                return Err(WireError::ConsumerConflict(name.to_string()));
            }
        }
        inner.consumers.entry(name.to_string()).or_insert_with(|| ConsumerState { config, cursor: 0, pending: HashMap::new() });
        Ok(())
    }

    async fn consume(&self, consumer: &str, max: usize) -> Result<Vec<Delivery>, WireError> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();

        let config = inner
            .consumers
            .get(consumer)
            .map(|c| c.config.clone())
            .ok_or_else(|| WireError::UnknownConsumer(consumer.to_string()))?;

        let mut results = Vec::new();

        let due_sequences: Vec<u64> = {
            let state = inner.consumers.get(consumer).expect("checked above");
            let mut due: Vec<u64> = state
                .pending
                .iter()
                .filter(|(_, p)| p.next_attempt_ms <= now)
                .map(|(seq, _)| *seq)
                .collect();
            due.sort_unstable();
            due
        };

        for sequence in due_sequences {
            if results.len() >= max {
                break;
            }
            let state = inner.consumers.get_mut(consumer).expect("checked above");
            let pending = state.pending.get_mut(&sequence).expect("sequence came from this map");
            pending.delivery_count += 1;
            if config.max_deliver != 0 && pending.delivery_count > config.max_deliver {
                tracing::warn!(consumer, sequence, "redelivery exhausted, dropping message");
                state.pending.remove(&sequence);
                continue;
            }
            pending.next_attempt_ms = now + config.backoff_for_attempt(pending.delivery_count).as_millis() as u64;
            results.push(Delivery {
                sequence,
                subject: pending.subject.clone(),
                payload: pending.payload.clone(),
                delivery_count: pending.delivery_count,
            });
        }

        if results.len() < max {
            let log_len = inner.log.len();
            let start = {
                let state = inner.consumers.get_mut(consumer).expect("checked above");
                *cursor_for(consumer, state, &mut inner.group_cursors)
            };
            let mut idx = start;
            while idx < log_len && results.len() < max {
                let (matches, sequence, subject, payload) = {
                    let msg = &inner.log[idx];
                    (subject_matches(&config.filter_subject, &msg.subject), msg.sequence, msg.subject.clone(), msg.payload.clone())
                };
                if matches {
                    let state = inner.consumers.get_mut(consumer).expect("checked above");
                    state.pending.insert(
                        sequence,
                        PendingDelivery {
                            subject: subject.clone(),
                            payload: payload.clone(),
                            delivery_count: 1,
                            next_attempt_ms: now + config.backoff_for_attempt(1).as_millis() as u64,
                        },
                    );
                    results.push(Delivery { sequence, subject, payload, delivery_count: 1 });
                }
                idx += 1;
            }
            let state = inner.consumers.get_mut(consumer).expect("checked above");
            *cursor_for(consumer, state, &mut inner.group_cursors) = idx;
        }

        Ok(results)
    }

    async fn ack(&self, consumer: &str, sequence: u64) -> Result<(), WireError> {
        let mut inner = self.inner.lock();
        let state = inner.consumers.get_mut(consumer).ok_or_else(|| WireError::UnknownConsumer(consumer.to_string()))?;
        state.pending.remove(&sequence).ok_or_else(|| WireError::UnknownDelivery(sequence, consumer.to_string()))?;
        Ok(())
    }

    async fn nack(&self, consumer: &str, sequence: u64) -> Result<(), WireError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let state = inner.consumers.get_mut(consumer).ok_or_else(|| WireError::UnknownConsumer(consumer.to_string()))?;
        let pending = state.pending.get_mut(&sequence).ok_or_else(|| WireError::UnknownDelivery(sequence, consumer.to_string()))?;
        pending.next_attempt_ms = now;
        Ok(())
    }

    async fn kv_put(&self, bucket: &str, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), WireError> {
        let expires_at_ms = ttl.map(|d| self.clock.epoch_ms() + d.as_millis() as u64);
        let mut inner = self.inner.lock();
        inner.kv.entry(bucket.to_string()).or_default().insert(key.to_string(), KvEntry { value, expires_at_ms });
        Ok(())
    }

    async fn kv_get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, WireError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let Some(table) = inner.kv.get_mut(bucket) else {
            return Ok(None);
        };
        let expired = table.get(key).is_some_and(|e| e.expires_at_ms.is_some_and(|exp| exp <= now));
        if expired {
            table.remove(key);
            return Ok(None);
        }
        Ok(table.get(key).map(|e| e.value.clone()))
    }

    async fn kv_delete(&self, bucket: &str, key: &str) -> Result<(), WireError> {
        let mut inner = self.inner.lock();
        if let Some(table) = inner.kv.get_mut(bucket) {
            table.remove(key);
        }
        Ok(())
    }

    async fn kv_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, WireError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let Some(table) = inner.kv.get_mut(bucket) else {
            return Ok(Vec::new());
        };
        table.retain(|_, entry| entry.expires_at_ms.is_none_or(|exp| exp > now));
        let mut keys: Vec<String> = table.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
