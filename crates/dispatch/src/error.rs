// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no live worker matches target {0:?}")]
    UnknownTarget(String),

    #[error(transparent)]
    Storage(#[from] fleet_storage::StorageError),

    #[error(transparent)]
    Bus(#[from] fleet_wire::WireError),

    #[error("failed to encode job payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<DispatchError> for fleet_core::OrchError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownTarget(t) => fleet_core::OrchError::UnknownTarget(t),
            other => fleet_core::OrchError::Transport(other.to_string()),
        }
    }
}
