// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed job payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("no dispatch route for operation {0:?}")]
    UnknownOperation(String),

    #[error(transparent)]
    Storage(#[from] fleet_storage::StorageError),

    #[error(transparent)]
    Bus(#[from] fleet_wire::WireError),
}
