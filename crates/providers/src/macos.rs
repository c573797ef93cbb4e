// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::command;
use crate::error::ProviderError;
use crate::linux::{parse_df_output, parse_ping_summary};
use crate::provider::NodeProvider;
use crate::types::{CommandOutput, DiskUsage, DnsConfig, LoadAverages, MemoryInfo, OsInfo, PingResult};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MacosProvider;

#[async_trait]
impl NodeProvider for MacosProvider {
    async fn exec(&self, command: &str, args: &[String], cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::exec(command, args, cwd, timeout).await
    }

    async fn shell(&self, command: &str, cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
        command::shell(command, cwd, timeout).await
    }

    async fn hostname(&self) -> Result<String, ProviderError> {
        let output = command::exec("scutil", &["--get".to_string(), "LocalHostName".to_string()], None, command::resolve_timeout(None)).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn uptime(&self) -> Result<Duration, ProviderError> {
        let output = command::exec("sysctl", &["-n".to_string(), "kern.boottime".to_string()], None, command::resolve_timeout(None)).await?;
        // Output looks like: `{ sec = 1700000000, usec = 0 } Mon Jan  1 00:00:00 2024`
        let sec: u64 = output
            .stdout
            .split("sec = ")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| ProviderError::Parse(format!("unexpected kern.boottime output: {:?}", output.stdout)))?;
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs();
        Ok(Duration::from_secs(now.saturating_sub(sec)))
    }

    async fn os_info(&self) -> Result<OsInfo, ProviderError> {
        let name = command::exec("sw_vers", &["-productName".to_string()], None, command::resolve_timeout(None)).await?.stdout.trim().to_string();
        let version = command::exec("sw_vers", &["-productVersion".to_string()], None, command::resolve_timeout(None)).await?.stdout.trim().to_string();
        Ok(OsInfo { family: "macos".to_string(), name, version, arch: std::env::consts::ARCH.to_string() })
    }

    async fn disk_usage(&self) -> Result<Vec<DiskUsage>, ProviderError> {
        let output = command::exec("df", &["-Pk".to_string()], None, command::resolve_timeout(None)).await?;
        Ok(parse_df_output(&output.stdout))
    }

    async fn memory(&self) -> Result<MemoryInfo, ProviderError> {
        let total_output = command::exec("sysctl", &["-n".to_string(), "hw.memsize".to_string()], None, command::resolve_timeout(None)).await?;
        let total_bytes: u64 = total_output
            .stdout
            .trim()
            .parse()
            .map_err(|_| ProviderError::Parse(format!("unexpected hw.memsize output: {:?}", total_output.stdout)))?;
        let vm_stat = command::exec("vm_stat", &[], None, command::resolve_timeout(None)).await?;
        let available_bytes = parse_vm_stat_available(&vm_stat.stdout).unwrap_or(0);
        Ok(MemoryInfo { total_bytes, available_bytes, used_bytes: total_bytes.saturating_sub(available_bytes) })
    }

    async fn load_averages(&self) -> Result<LoadAverages, ProviderError> {
        let output = command::exec("sysctl", &["-n".to_string(), "vm.loadavg".to_string()], None, command::resolve_timeout(None)).await?;
        parse_loadavg_braced(&output.stdout).ok_or_else(|| ProviderError::Parse(format!("unexpected vm.loadavg output: {:?}", output.stdout)))
    }

    async fn ping(&self, address: &str, count: u32) -> Result<PingResult, ProviderError> {
        let output = command::exec("ping", &["-c".to_string(), count.to_string(), address.to_string()], None, command::resolve_timeout(None)).await?;
        Ok(parse_ping_summary(address, count, &output.stdout))
    }

    async fn dns_get(&self, iface: &str) -> Result<DnsConfig, ProviderError> {
        let servers = command::exec("networksetup", &["-getdnsservers".to_string(), iface.to_string()], None, command::resolve_timeout(None)).await?;
        let searches = command::exec("networksetup", &["-getsearchdomains".to_string(), iface.to_string()], None, command::resolve_timeout(None)).await?;
        Ok(DnsConfig {
            interface: iface.to_string(),
            servers: parse_networksetup_list(&servers.stdout),
            searches: parse_networksetup_list(&searches.stdout),
        })
    }

    async fn dns_update(&self, servers: &[String], searches: &[String], iface: &str) -> Result<bool, ProviderError> {
        let before = self.dns_get(iface).await.unwrap_or(DnsConfig { interface: iface.to_string(), servers: Vec::new(), searches: Vec::new() });

        let mut server_args = vec!["-setdnsservers".to_string(), iface.to_string()];
        server_args.extend(servers.iter().cloned());
        command::exec("networksetup", &server_args, None, command::resolve_timeout(None)).await?;

        let mut search_args = vec!["-setsearchdomains".to_string(), iface.to_string()];
        search_args.extend(searches.iter().cloned());
        command::exec("networksetup", &search_args, None, command::resolve_timeout(None)).await?;

        Ok(before.servers != servers || before.searches != searches)
    }
}

fn parse_vm_stat_available(stdout: &str) -> Option<u64> {
    let page_size = stdout
        .lines()
        .next()
        .and_then(|line| line.split("page size of").nth(1))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(4096);
    let free_pages: u64 = stdout
        .lines()
        .find(|line| line.starts_with("Pages free:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|s| s.trim().trim_end_matches('.').parse().ok())?;
    Some(free_pages * page_size)
}

fn parse_loadavg_braced(stdout: &str) -> Option<LoadAverages> {
    let inner = stdout.trim().trim_start_matches('{').trim_end_matches('}');
    let mut fields = inner.split_whitespace();
    let one = fields.next()?.parse().ok()?;
    let five = fields.next()?.parse().ok()?;
    let fifteen = fields.next()?.parse().ok()?;
    Some(LoadAverages { one, five, fifteen })
}

fn parse_networksetup_list(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().contains("there aren't any") {
        return Vec::new();
    }
    trimmed.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}
