// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leased worker registry, keyed by sanitized hostname.

use crate::error::StorageError;
use fleet_core::{Clock, SanitizedHostname, WorkerRegistration};
use fleet_wire::MessageBus;
use std::time::Duration;

const BUCKET: &str = "workers";

pub struct Registry<'a> {
    bus: &'a dyn MessageBus,
}

impl<'a> Registry<'a> {
    pub fn new(bus: &'a dyn MessageBus) -> Self {
        Self { bus }
    }

    /// Register `reg`, keyed by its sanitized hostname. Rejects the write
    /// with [`StorageError::HostnameCollision`] if a *different* original
    /// hostname already holds that sanitized key — sanitization is
    /// many-to-one and a silent first-writer-wins would let one worker's
    /// jobs route to another.
    pub async fn register(&self, reg: &WorkerRegistration) -> Result<(), StorageError> {
        if let Some(existing) = self.get(&reg.sanitized).await? {
            if existing.hostname != reg.hostname {
                return Err(StorageError::HostnameCollision {
                    sanitized: reg.sanitized.as_str().to_string(),
                    existing: existing.hostname.as_str().to_string(),
                    candidate: reg.hostname.as_str().to_string(),
                });
            }
        }
        self.put(reg).await
    }

    async fn put(&self, reg: &WorkerRegistration) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(reg).map_err(|e| StorageError::Corrupt(reg.registry_key(), e))?;
        let ttl = Duration::from_millis(reg.ttl_ms.saturating_mul(2));
        self.bus.kv_put(BUCKET, reg.sanitized.as_str(), encoded, Some(ttl)).await?;
        Ok(())
    }

    pub async fn get(&self, sanitized: &SanitizedHostname) -> Result<Option<WorkerRegistration>, StorageError> {
        let Some(bytes) = self.bus.kv_get(BUCKET, sanitized.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(sanitized.as_str().to_string(), e))?))
    }

    /// Refresh an already-registered worker's heartbeat, extending its lease.
    pub async fn heartbeat(&self, sanitized: &SanitizedHostname, clock: &impl Clock) -> Result<(), StorageError> {
        let mut reg = match self.get(sanitized).await? {
            Some(reg) => reg,
            None => return Err(StorageError::JobNotFound(sanitized.as_str().to_string())),
        };
        reg.heartbeat(clock);
        self.put(&reg).await
    }

    pub async fn deregister(&self, sanitized: &SanitizedHostname) -> Result<(), StorageError> {
        self.bus.kv_delete(BUCKET, sanitized.as_str()).await?;
        Ok(())
    }

    /// Every registration whose heartbeat lease has not expired under `clock`.
    pub async fn list_live(&self, clock: &impl Clock) -> Result<Vec<WorkerRegistration>, StorageError> {
        let keys = self.bus.kv_keys(BUCKET, "").await?;
        let mut live = Vec::new();
        for key in keys {
            if let Some(bytes) = self.bus.kv_get(BUCKET, &key).await? {
                let reg: WorkerRegistration = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(key, e))?;
                if !reg.is_expired(clock) {
                    live.push(reg);
                }
            }
        }
        Ok(live)
    }

    /// Live registrations carrying the exact `key=value` label.
    pub async fn list_live_with_label(&self, clock: &impl Clock, key: &str, value: &str) -> Result<Vec<WorkerRegistration>, StorageError> {
        Ok(self.list_live(clock).await?.into_iter().filter(|reg| reg.has_label(key, value)).collect())
    }
}
