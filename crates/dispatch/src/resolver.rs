// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves a [`TargetSelector`] against the live worker registry: does the
//! target exist, and how many responses should a caller expect back.

use crate::error::DispatchError;
use fleet_core::{sanitize, Clock, TargetSelector};
use fleet_storage::Registry;

pub struct ResolvedTarget {
    /// How many `Response` records a caller should wait for before
    /// considering this job's dispatch complete.
    pub expected_responses: usize,
}

pub struct TargetResolver;

impl TargetResolver {
    /// Validate `selector` against the registry and compute its expected
    /// response count.
    ///
    /// - `Any`/`Host`: exactly one response is expected; `Host` additionally
    ///   requires a live worker at that sanitized hostname.
    /// - `All`/`Label`: the expected count is however many live workers
    ///   currently match — zero is legal (the job has no effect, not an error).
    pub async fn resolve(registry: &Registry<'_>, clock: &impl Clock, selector: &TargetSelector) -> Result<ResolvedTarget, DispatchError> {
        match selector {
            TargetSelector::Any => {
                if registry.list_live(clock).await?.is_empty() {
                    return Err(DispatchError::UnknownTarget(TargetSelector::Any.token()));
                }
                Ok(ResolvedTarget { expected_responses: 1 })
            }
            TargetSelector::Host(host) => {
                let sanitized = sanitize(host);
                match registry.get(&sanitized).await? {
                    Some(reg) if !reg.is_expired(clock) => Ok(ResolvedTarget { expected_responses: 1 }),
                    _ => Err(DispatchError::UnknownTarget(host.clone())),
                }
            }
            TargetSelector::All => {
                let live = registry.list_live(clock).await?;
                Ok(ResolvedTarget { expected_responses: live.len() })
            }
            TargetSelector::Label { key, value } => {
                let live = registry.list_live_with_label(clock, key, value).await?;
                Ok(ResolvedTarget { expected_responses: live.len() })
            }
        }
    }
}
