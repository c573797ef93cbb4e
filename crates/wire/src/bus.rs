// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The messaging-substrate abstraction: durable pub/sub consumers plus a
//! TTL'd key-value store. Implementations are expected to wrap a real
//! broker (JetStream); [`crate::InProcessBus`] is a single-process reference
//! implementation used by tests and the bundled binaries.

use crate::consumer::{ConsumerConfig, Delivery};
use crate::error::WireError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload under `subject`, assigning it the next sequence number.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64, WireError>;

    /// Create a durable consumer if `name` doesn't exist yet, otherwise
    /// validate that `config` matches the existing one.
    async fn create_or_update_consumer(&self, name: &str, config: ConsumerConfig) -> Result<(), WireError>;

    /// Pull up to `max` pending deliveries for `consumer`: redeliveries whose
    /// backoff has elapsed first, then new messages matching its filter.
    async fn consume(&self, consumer: &str, max: usize) -> Result<Vec<Delivery>, WireError>;

    /// Acknowledge a delivery, removing it from the consumer's pending set.
    async fn ack(&self, consumer: &str, sequence: u64) -> Result<(), WireError>;

    /// Negatively acknowledge a delivery, making it eligible for immediate redelivery.
    async fn nack(&self, consumer: &str, sequence: u64) -> Result<(), WireError>;

    async fn kv_put(&self, bucket: &str, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), WireError>;
    async fn kv_get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, WireError>;
    async fn kv_delete(&self, bucket: &str, key: &str) -> Result<(), WireError>;
    /// List keys in `bucket` whose name starts with `prefix`.
    async fn kv_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, WireError>;
}
