// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::command;
use crate::error::ProviderError;
use crate::provider::NodeProvider;
use crate::types::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, OsInfo, PingResult};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct LinuxProvider;

#[async_trait]
impl NodeProvider for LinuxProvider {
    async fn exec(&self, command: &str, args: &[String], cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::exec(command, args, cwd, timeout).await
    }

    async fn shell(&self, command: &str, cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::shell(command, cwd, timeout).await
    }

    async fn hostname(&self) -> Result<String, ProviderError> {
        let raw = tokio::fs::read_to_string("/proc/sys/kernel/hostname")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/proc/sys/kernel/hostname".to_string(), source })?;
        Ok(raw.trim().to_string())
    }

    async fn uptime(&self) -> Result<Duration, ProviderError> {
        let raw = tokio::fs::read_to_string("/proc/uptime")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/proc/uptime".to_string(), source })?;
        let seconds: f64 = raw
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ProviderError::Parse(format!("unexpected /proc/uptime contents: {raw:?}")))?;
        Ok(Duration::from_secs_f64(seconds))
    }

    async fn os_info(&self) -> Result<OsInfo, ProviderError> {
        let raw = tokio::fs::read_to_string("/etc/os-release")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/etc/os-release".to_string(), source })?;
        Ok(parse_os_release(&raw))
    }

    async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError> {
        let output = command::exec("df", &["-Pk".to_string()], None, command::resolve_timeout(None)).await?;
        Ok(parse_df_output(&output.stdout))
    }

    async fn memory(&self) -> Result<MemoryInfo, ProviderError> {
        let raw = tokio::fs::read_to_string("/proc/meminfo")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/proc/meminfo".to_string(), source })?;
        parse_meminfo(&raw).ok_or_else(|| ProviderError::Parse("unexpected /proc/meminfo contents".to_string()))
    }

    async fn load_averages(&self) -> Result<LoadAverages, ProviderError> {
        let raw = tokio::fs::read_to_string("/proc/loadavg")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/proc/loadavg".to_string(), source })?;
        parse_loadavg(&raw).ok_or_else(|| ProviderError::Parse(format!("unexpected /proc/loadavg contents: {raw:?}")))
    }

    async fn ping(&self, address: &str, count: u32) -> Result<PingResult, ProviderError> {
        let output = command::exec("ping", &["-c".to_string(), count.to_string(), address.to_string()], None, command::resolve_timeout(None)).await?;
        Ok(parse_ping_summary(address, count, &output.stdout))
    }

    async fn dns_get(&self, iface: &str) -> Result<DnsConfig, ProviderError> {
        let raw = tokio::fs::read_to_string("/etc/resolv.conf")
            .await
            .map_err(|source| ProviderError::Spawn { command: "/etc/resolv.conf".to_string(), source })?;
        Ok(parse_resolv_conf(iface, &raw))
    }

    async fn dns_update(&self, servers: &[String], searches: &[String], iface: &str) -> Result<bool, ProviderError> {
        let path = "/etc/resolv.conf";
        let previous = tokio::fs::read_to_string(path).await.unwrap_or_default();

        let mut rendered = String::new();
        if !searches.is_empty() {
            rendered.push_str(&format!("search {}\n", searches.join(" ")));
        }
        for server in servers {
            rendered.push_str(&format!("nameserver {server}\n"));
        }

        // resolv.conf has no interface scoping; `iface` is accepted only
        // for symmetry with `dns_get`.
        let _ = iface;
        let changed = rendered.trim() != previous.trim();
        if changed {
            tokio::fs::write(path, &rendered).await.map_err(|source| ProviderError::Spawn { command: path.to_string(), source })?;
        }
        Ok(changed)
    }
}

fn parse_os_release(raw: &str) -> OsInfo {
    let mut name = "linux".to_string();
    let mut version = "unknown".to_string();
    for line in raw.lines() {
        if let Some(value) = line.strip_prefix("NAME=") {
            name = value.trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("VERSION_ID=") {
            version = value.trim_matches('"').to_string();
        }
    }
    OsInfo { family: "linux".to_string(), name, version, arch: std::env::consts::ARCH.to_string() }
}

/// Parse `df -Pk` output shared with the macOS provider (same POSIX format).
pub(crate) fn parse_df_output(stdout: &str) -> Vec<DiskUsage> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let total_kb: u64 = fields[1].parse().ok()?;
            let used_kb: u64 = fields[2].parse().ok()?;
            let available_kb: u64 = fields[3].parse().ok()?;
            Some(DiskUsage {
                mount: fields[5].to_string(),
                total_bytes: total_kb * 1024,
                used_bytes: used_kb * 1024,
                available_bytes: available_kb * 1024,
            })
        })
        .collect()
}

fn parse_meminfo(raw: &str) -> Option<MemoryInfo> {
    let mut total_kb = None;
    let mut available_kb = None;
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.split_whitespace().next().and_then(|s| s.parse::<u64>().ok());
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.split_whitespace().next().and_then(|s| s.parse::<u64>().ok());
        }
    }
    let total_kb = total_kb?;
    let available_kb = available_kb?;
    Some(MemoryInfo { total_bytes: total_kb * 1024, available_bytes: available_kb * 1024, used_bytes: total_kb.saturating_sub(available_kb) * 1024 })
}

fn parse_loadavg(raw: &str) -> Option<LoadAverages> {
    let mut fields = raw.split_whitespace();
    let one = fields.next()?.parse().ok()?;
    let five = fields.next()?.parse().ok()?;
    let fifteen = fields.next()?.parse().ok()?;
    Some(LoadAverages { one, five, fifteen })
}

fn parse_resolv_conf(iface: &str, raw: &str) -> DnsConfig {
    let mut servers = Vec::new();
    let mut searches = Vec::new();
    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("nameserver") => servers.extend(parts.next().map(str::to_string)),
            Some("search") => searches.extend(parts.map(str::to_string)),
            _ => {}
        }
    }
    DnsConfig { interface: iface.to_string(), servers, searches }
}

/// Parse the `N transmitted, M received` summary line common to both
/// `iputils-ping` and BSD `ping` output.
pub(crate) fn parse_ping_summary(host: &str, requested: u32, stdout: &str) -> PingResult {
    let mut transmitted = requested;
    let mut received = 0;
    for line in stdout.lines() {
        if line.contains("transmitted") {
            let numbers: Vec<u32> = line.split_whitespace().filter_map(|tok| tok.parse().ok()).collect();
            if let Some(&t) = numbers.first() {
                transmitted = t;
            }
            if let Some(&r) = numbers.get(1) {
                received = r;
            }
        }
    }
    let packet_loss_pct = if transmitted == 0 { 100.0 } else { 100.0 * (1.0 - received as f32 / transmitted as f32) };
    PingResult { host: host.to_string(), transmitted, received, packet_loss_pct }
}
