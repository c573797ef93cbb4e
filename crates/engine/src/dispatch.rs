// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes a job's `<category>.<operation>` to the node provider call it
//! names, translating provider results into the `(changed, data)` pair a
//! [`fleet_core::Response`] carries.

use crate::error::EngineError;
use fleet_core::{Changed, Job, Mode};
use fleet_providers::{resolve_timeout, CommandOutput, NodeProvider};
use serde_json::{json, Value};
use std::fmt;

/// The outcome of a failed dispatch: whether redelivery could plausibly
/// change the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// Bad routing or a malformed job — identical on every retry. The
    /// worker processor acks immediately instead of waiting out
    /// `max_deliver`.
    Terminal(String),
    /// The provider call itself failed, the command exited nonzero, or it
    /// timed out. Left unacked so the consumer fabric redelivers it.
    Retryable(String),
}

impl DispatchFailure {
    pub fn message(&self) -> &str {
        match self {
            DispatchFailure::Terminal(m) | DispatchFailure::Retryable(m) => m,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchFailure::Terminal(_))
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub struct ProviderDispatch {
    provider: Box<dyn NodeProvider>,
}

impl ProviderDispatch {
    pub fn new(provider: Box<dyn NodeProvider>) -> Self {
        Self { provider }
    }

    /// Execute `job`'s operation against the bound provider.
    ///
    /// Returns `Ok((changed, data))` on success; `Err` distinguishes a
    /// terminal failure (ack and give up) from a retryable one (leave
    /// unacked for redelivery) — see [`DispatchFailure`].
    pub async fn run(&self, job: &Job) -> Result<(Changed, Value), DispatchFailure> {
        let category = job.category();
        let base = job.operation_name().split('.').next().unwrap_or("");
        match (category, base) {
            ("command", "exec") => self.exec(&job.params).await,
            ("command", "shell") => self.shell(&job.params).await,
            ("node", "hostname") => self.hostname().await,
            ("node", "status") => self.status().await,
            ("node", "uptime") => self.uptime().await,
            ("node", "os") | ("node", "osinfo") => self.os_info().await,
            ("node", "disk") => self.disk().await,
            ("node", "memory") | ("node", "mem") => self.memory().await,
            ("node", "load") => self.load().await,
            ("network", "dns") => self.dns(job.mode, &job.params).await,
            ("network", "ping") => self.ping(&job.params).await,
            (category, base) => Err(DispatchFailure::Terminal(EngineError::UnknownOperation(format!("{category}.{base}")).to_string())),
        }
    }

    async fn exec(&self, params: &Value) -> Result<(Changed, Value), DispatchFailure> {
        let command = required_str(params, "command")?;
        let args = string_array(params, "args");
        let cwd = params.get("cwd").and_then(Value::as_str);
        let timeout = resolve_timeout(params.get("timeout").and_then(Value::as_u64));
        let output = self.provider.exec(command, &args, cwd, timeout).await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        command_outcome(output)
    }

    async fn shell(&self, params: &Value) -> Result<(Changed, Value), DispatchFailure> {
        let command = required_str(params, "command")?;
        let cwd = params.get("cwd").and_then(Value::as_str);
        let timeout = resolve_timeout(params.get("timeout").and_then(Value::as_u64));
        let output = self.provider.shell(command, cwd, timeout).await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        command_outcome(output)
    }

    async fn hostname(&self) -> Result<(Changed, Value), DispatchFailure> {
        let hostname = self.provider.hostname().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        Ok((Changed::No, json!({"hostname": hostname})))
    }

    async fn uptime(&self) -> Result<(Changed, Value), DispatchFailure> {
        let uptime = self.provider.uptime().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        Ok((Changed::No, json!({"uptime_secs": uptime.as_secs()})))
    }

    async fn status(&self) -> Result<(Changed, Value), DispatchFailure> {
        let hostname = self.provider.hostname().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        let uptime = self.provider.uptime().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        // os_info is best-effort here: a platform without one (the generic
        // fallback) shouldn't fail the whole status rollup.
        let os = self.provider.os_info().await.ok();
        Ok((Changed::No, json!({"hostname": hostname, "uptime_secs": uptime.as_secs(), "os": os})))
    }

    async fn os_info(&self) -> Result<(Changed, Value), DispatchFailure> {
        let info = self.provider.os_info().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        to_changed_value(&info)
    }

    async fn disk(&self) -> Result<(Changed, Value), DispatchFailure> {
        let disks = self.provider.disk_usage().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        Ok((Changed::No, json!({"disks": disks})))
    }

    async fn memory(&self) -> Result<(Changed, Value), DispatchFailure> {
        let memory = self.provider.memory().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        to_changed_value(&memory)
    }

    async fn load(&self) -> Result<(Changed, Value), DispatchFailure> {
        let load = self.provider.load_averages().await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        to_changed_value(&load)
    }

    async fn ping(&self, params: &Value) -> Result<(Changed, Value), DispatchFailure> {
        let address = required_str(params, "address")?;
        let count = params.get("count").and_then(Value::as_u64).unwrap_or(4) as u32;
        let result = self.provider.ping(address, count).await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
        to_changed_value(&result)
    }

    async fn dns(&self, mode: Mode, params: &Value) -> Result<(Changed, Value), DispatchFailure> {
        let iface = params.get("interface").and_then(Value::as_str).unwrap_or("eth0");
        match mode {
            Mode::Query => {
                let config = self.provider.dns_get(iface).await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
                to_changed_value(&config)
            }
            Mode::Modify => {
                let servers = string_array(params, "servers");
                let searches = string_array(params, "searches");
                let changed = self.provider.dns_update(&servers, &searches, iface).await.map_err(|e| DispatchFailure::Retryable(e.to_string()))?;
                Ok((
                    if changed { Changed::Yes } else { Changed::No },
                    json!({"success": true, "changed": changed, "message": "dns configuration updated"}),
                ))
            }
        }
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, DispatchFailure> {
    params.get(key).and_then(Value::as_str).ok_or_else(|| DispatchFailure::Terminal(format!("missing {key:?} parameter")))
}

fn string_array(params: &Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn to_changed_value(value: &impl serde::Serialize) -> Result<(Changed, Value), DispatchFailure> {
    Ok((Changed::No, serde_json::to_value(value).map_err(|e| DispatchFailure::Terminal(e.to_string()))?))
}

fn command_outcome(output: CommandOutput) -> Result<(Changed, Value), DispatchFailure> {
    let data = json!({
        "exit_code": output.exit_code,
        "stdout": output.stdout,
        "stderr": output.stderr,
        "duration_ms": output.duration_ms,
    });
    if !output.succeeded() {
        return Err(DispatchFailure::Retryable(format!("exit code {}: {}", output.exit_code, output.stderr)));
    }
    Ok((Changed::Yes, data))
}
