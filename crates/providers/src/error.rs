// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to spawn {command:?}: {source}")]
    Spawn { command: String, source: std::io::Error },

    #[error("{command:?} exited with status {code:?}: {stderr}")]
    NonZeroExit { command: String, code: Option<i32>, stderr: String },

    #[error("capability {0:?} is not available on this platform")]
    Unsupported(String),

    #[error("failed to parse provider output: {0}")]
    Parse(String),
}
