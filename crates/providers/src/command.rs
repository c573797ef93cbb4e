// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `exec`/`shell` execution, common to every platform provider.

use crate::error::ProviderError;
use crate::types::CommandOutput;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// Used when a job's `timeout` parameter is absent or `0`.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolve a job's optional `timeout` (seconds) parameter. `0` or absent
/// both mean [`DEFAULT_TIMEOUT_SECS`].
pub fn resolve_timeout(requested_secs: Option<u64>) -> Duration {
    match requested_secs {
        None | Some(0) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        Some(secs) => Duration::from_secs(secs),
    }
}

/// Run `command` directly (no shell interpolation) with `args`, in `cwd`
/// if given. Returns exit code `-1` rather than an error if `timeout` elapses.
pub async fn exec(command: &str, args: &[String], cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
    let mut cmd = Command::new(command);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    run(cmd, command, timeout).await
}

/// Run `command` through the platform shell (`sh -c` on Unix, `cmd /C` on Windows).
pub async fn shell(command: &str, cwd: Option<&str>, timeout: Duration) -> Result<CommandOutput, ProviderError> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("/bin/sh");
        c.arg("-c").arg(command);
        c
    };
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    run(cmd, command, timeout).await
}

async fn run(mut cmd: Command, label: &str, timeout: Duration) -> Result<CommandOutput, ProviderError> {
    cmd.kill_on_drop(true);
    let started = Instant::now();
    let child = cmd.spawn().map_err(|source| ProviderError::Spawn { command: label.to_string(), source })?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(to_command_output(output, started.elapsed())),
        Ok(Err(source)) => Err(ProviderError::Spawn { command: label.to_string(), source }),
        Err(_) => Ok(CommandOutput {
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("{label:?} timed out after {timeout:?}"),
            duration_ms: started.elapsed().as_millis() as u64,
        }),
    }
}

fn to_command_output(output: std::process::Output, elapsed: Duration) -> CommandOutput {
    CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms: elapsed.as_millis() as u64,
    }
}
