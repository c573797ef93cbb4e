// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job {0} already exists")]
    JobAlreadyExists(String),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("event {sequence} for job {job_id} is out of order: expected {expected}")]
    OutOfOrderEvent { job_id: String, sequence: u64, expected: u64 },

    #[error("event {sequence} for job {job_id} is not a legal transition from {from}")]
    IllegalTransition { job_id: String, sequence: u64, from: String },

    #[error("hostname {candidate:?} sanitizes to {sanitized:?}, already claimed by {existing:?}")]
    HostnameCollision { sanitized: String, existing: String, candidate: String },

    #[error(transparent)]
    Bus(#[from] fleet_wire::WireError),

    #[error("corrupt record at {0}: {1}")]
    Corrupt(String, serde_json::Error),
}

impl From<StorageError> for fleet_core::OrchError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::JobAlreadyExists(id) => fleet_core::OrchError::AlreadyExists(id),
            StorageError::JobNotFound(id) => fleet_core::OrchError::NotFound(id),
            StorageError::HostnameCollision { sanitized, existing, candidate } => {
                fleet_core::OrchError::HostnameCollision { sanitized, existing, candidate }
            }
            other => fleet_core::OrchError::Storage(other.to_string()),
        }
    }
}
