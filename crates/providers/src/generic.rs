// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fallback provider for platforms with no dedicated implementation.
//! Covers command execution everywhere; `node`/`network` facts that depend
//! on a platform-specific source report [`ProviderError::Unsupported`].

use crate::command;
use crate::error::ProviderError;
use crate::provider::NodeProvider;
use crate::types::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, OsInfo, PingResult};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct GenericProvider;

#[async_trait]
impl NodeProvider for GenericProvider {
    async fn exec(&self, command: &str, args: &[String], cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::exec(command, args, cwd, timeout).await
    }

    async fn shell(&self, command: &str, cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::shell(command, cwd, timeout).await
    }

    async fn hostname(&self) -> Result<String, ProviderError> {
        let output = command::exec("hostname", &[], None, command::resolve_timeout(None)).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn uptime(&self) -> Result<Duration, ProviderError> {
        Err(ProviderError::Unsupported("node.uptime.get".to_string()))
    }

    async fn os_info(&self) -> Result<OsInfo, ProviderError> {
        Err(ProviderError::Unsupported("node.os.get".to_string()))
    }

    async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError> {
        Err(ProviderError::Unsupported("node.disk.get".to_string()))
    }

    async fn memory(&self) -> Result<MemoryInfo, ProviderError> {
        Err(ProviderError::Unsupported("node.memory.get".to_string()))
    }

    async fn load_averages(&self) -> Result<LoadAverages, ProviderError> {
        Err(ProviderError::Unsupported("node.load.get".to_string()))
    }

    async fn ping(&self, address: &str, count: u32) -> Result<PingResult, ProviderError> {
        let output = command::exec("ping", &["-c".to_string(), count.to_string(), address.to_string()], None, command::resolve_timeout(None)).await?;
        Ok(crate::linux::parse_ping_summary(address, count, &output.stdout))
    }

    async fn dns_get(&self, _iface: &str) -> Result<DnsConfig, ProviderError> {
        Err(ProviderError::Unsupported("network.dns.get".to_string()))
    }

    async fn dns_update(&self, _servers: &[String], _searches: &[String], _iface: &str) -> Result<bool, ProviderError> {
        Err(ProviderError::Unsupported("network.dns.update".to_string()))
    }
}
