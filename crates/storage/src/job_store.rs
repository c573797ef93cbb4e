// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-once storage for immutable [`Job`] blobs.

use crate::error::StorageError;
use fleet_core::{Job, JobId};
use fleet_wire::MessageBus;

const BUCKET: &str = "jobs";

pub struct JobStore<'a> {
    bus: &'a dyn MessageBus,
}

impl<'a> JobStore<'a> {
    pub fn new(bus: &'a dyn MessageBus) -> Self {
        Self { bus }
    }

    /// Store `job`. Fails with [`StorageError::JobAlreadyExists`] if the ID
    /// is already taken — jobs are write-once, never updated in place.
    pub async fn put(&self, job: &Job) -> Result<(), StorageError> {
        if self.bus.kv_get(BUCKET, job.id.as_str()).await?.is_some() {
            return Err(StorageError::JobAlreadyExists(job.id.as_str().to_string()));
        }
        let encoded = serde_json::to_vec(job).map_err(|e| StorageError::Corrupt(job.id.as_str().to_string(), e))?;
        self.bus.kv_put(BUCKET, job.id.as_str(), encoded, None).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> Result<Option<Job>, StorageError> {
        let Some(bytes) = self.bus.kv_get(BUCKET, job_id.as_str()).await? else {
            return Ok(None);
        };
        let job = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(job_id.as_str().to_string(), e))?;
        Ok(Some(job))
    }

    pub async fn require(&self, job_id: &JobId) -> Result<Job, StorageError> {
        self.get(job_id).await?.ok_or_else(|| StorageError::JobNotFound(job_id.as_str().to_string()))
    }
}
