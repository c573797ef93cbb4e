// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("no consumer named {0:?} has been created")]
    UnknownConsumer(String),

    #[error("consumer {0:?} already bound to a different filter subject")]
    ConsumerConflict(String),

    #[error("delivery {0} is not pending ack on consumer {1:?}")]
    UnknownDelivery(u64, String),

    #[error("bucket {0:?} has no key {1:?}")]
    KeyNotFound(String, String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<WireError> for fleet_core::OrchError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::KeyNotFound(bucket, key) => fleet_core::OrchError::NotFound(format!("{bucket}.{key}")),
            other => fleet_core::OrchError::Transport(other.to_string()),
        }
    }
}
