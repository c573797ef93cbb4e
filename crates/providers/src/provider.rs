// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node-fact capability set every platform provider implements.

use crate::error::ProviderError;
use crate::types::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, OsInfo, PingResult};
use async_trait::async_trait;
use std::time::Duration;

/// Platform-specific operations a worker's `command`/`node`/`network`
/// job categories dispatch into. One implementation per target OS, chosen
/// at startup by [`crate::NodeProviderFactory::for_platform`].
#[async_trait]
pub trait NodeProvider: Send + Sync {
    async fn exec(&self, command: &str, args: &[String], cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError>;
    async fn shell(&self, command: &str, cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError>;
    async fn hostname(&self) -> Result<String, ProviderError>;
    async fn uptime(&self) -> Result<Duration, ProviderError>;
    async fn os_info(&self) -> Result<OsInfo, ProviderError>;
    async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError>;
    async fn memory(&self) -> Result<MemoryInfo, ProviderError>;
    async fn load_averages(&self) -> Result<LoadAverages, ProviderError>;
    async fn ping(&self, address: &str, count: u32) -> Result<PingResult, ProviderError>;
    async fn dns_get(&self, iface: &str) -> Result<DnsConfig, ProviderError>;
    async fn dns_update(&self, servers: &[String], searches: &[String], iface: &str) -> Result<bool, ProviderError>;
}
