// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-writer-wins per-`(job, worker)` response storage.

use crate::error::StorageError;
use fleet_core::{JobId, Response};
use fleet_wire::MessageBus;

const BUCKET: &str = "responses";

pub struct ResponseStore<'a> {
    bus: &'a dyn MessageBus,
}

impl<'a> ResponseStore<'a> {
    pub fn new(bus: &'a dyn MessageBus) -> Self {
        Self { bus }
    }

    /// Write `response`, overwriting any prior response from the same
    /// worker for the same job.
    pub async fn put(&self, response: &Response) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(response).map_err(|e| StorageError::Corrupt(response.store_key(), e))?;
        self.bus.kv_put(BUCKET, &response.store_key(), encoded, None).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId, worker: &str) -> Result<Option<Response>, StorageError> {
        let key = Response::key_for(job_id, worker);
        let Some(bytes) = self.bus.kv_get(BUCKET, &key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(key, e))?))
    }

    /// Every response recorded so far for `job_id`, one per responding worker.
    pub async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<Response>, StorageError> {
        let prefix = Response::job_prefix(job_id);
        let keys = self.bus.kv_keys(BUCKET, &prefix).await?;
        let mut responses = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.bus.kv_get(BUCKET, &key).await? {
                responses.push(serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(key, e))?);
            }
        }
        Ok(responses)
    }
}
