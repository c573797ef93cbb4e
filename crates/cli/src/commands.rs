// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use fleet_core::{JobId, TargetSelector};
use fleet_dispatch::Dispatcher;
use fleet_storage::{EventLog, JobStore, Registry, ResponseStore};
use fleet_wire::MessageBus;

use crate::output::{print_events, print_job_submitted, print_responses, print_workers, OutputFormat};

#[derive(Subcommand)]
pub enum Command {
    /// Submit a job and, optionally, wait for its responses.
    Dispatch {
        /// `_any`, `_all`, `label:key:value`, or a hostname
        target: String,
        /// `query` or `modify`
        mode: String,
        /// `<category>.<operation>`, e.g. `command.exec`
        operation: String,
        /// JSON params object for the operation
        #[arg(long, default_value = "null")]
        params: String,
        /// Wait for the expected number of responses before returning
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,
        /// Spin up this many embedded local workers for the duration of the command
        #[arg(long, default_value = "0")]
        embedded_workers: usize,
    },
    /// Show a job's stored record, event history, and responses.
    Show {
        job_id: String,
        #[arg(long, default_value = "0")]
        embedded_workers: usize,
    },
    /// List currently live workers.
    Worker(WorkerArgs),
}

#[derive(Args)]
pub struct WorkerArgs {
    #[command(subcommand)]
    pub command: WorkerCommand,
}

#[derive(Subcommand)]
pub enum WorkerCommand {
    List {
        #[arg(long, default_value = "0")]
        embedded_workers: usize,
    },
}

pub async fn run(command: Command, format: OutputFormat) -> Result<()> {
    let clock = fleet_core::SystemClock;
    let bus: Arc<dyn MessageBus> = Arc::new(fleet_wire::InProcessBus::new());

    match command {
        Command::Dispatch { target, mode, operation, params, wait, timeout_ms, embedded_workers } => {
            let _fleet = maybe_embed(bus.clone(), clock.clone(), embedded_workers).await?;
            dispatch(bus, clock, target, mode, operation, params, wait, timeout_ms, format).await
        }
        Command::Show { job_id, embedded_workers } => {
            let _fleet = maybe_embed(bus.clone(), clock.clone(), embedded_workers).await?;
            show(bus, job_id, format).await
        }
        Command::Worker(args) => match args.command {
            WorkerCommand::List { embedded_workers } => {
                let _fleet = maybe_embed(bus.clone(), clock.clone(), embedded_workers).await?;
                worker_list(bus, clock, format).await
            }
        },
    }
}

async fn maybe_embed(bus: Arc<dyn MessageBus>, clock: fleet_core::SystemClock, count: usize) -> Result<Option<crate::embedded::EmbeddedFleet>> {
    if count == 0 {
        return Ok(None);
    }
    let fleet = crate::embedded::spawn(bus, clock, count).await.context("failed to start embedded workers")?;
    // Give the fabric a moment to register before anything dispatches against it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(Some(fleet))
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(bus: Arc<dyn MessageBus>, clock: fleet_core::SystemClock, target: String, mode: String, operation: String, params: String, wait: bool, timeout_ms: u64, format: OutputFormat) -> Result<()> {
    let target: TargetSelector = target.parse().map_err(|e| anyhow!("invalid target: {e}"))?;
    let mode: fleet_core::Mode = mode.parse().map_err(|e| anyhow!("invalid mode: {e}"))?;
    let (category, op) = operation.split_once('.').ok_or_else(|| anyhow!("operation must be `<category>.<operation>`"))?;
    let params: serde_json::Value = serde_json::from_str(&params).context("params must be valid JSON")?;

    let dispatcher = Dispatcher::new(bus.clone(), clock);
    let result = dispatcher.submit(mode, category, op, params, target).await?;
    print_job_submitted(&result.job.id, result.expected_responses, format);

    if wait {
        let responses = dispatcher.await_responses(&result.job.id, result.expected_responses, Duration::from_millis(timeout_ms)).await?;
        print_responses(&responses, format);
    }
    Ok(())
}

async fn show(bus: Arc<dyn MessageBus>, job_id: String, format: OutputFormat) -> Result<()> {
    let job_id = JobId::from_string(job_id);
    let job = JobStore::new(bus.as_ref()).require(&job_id).await.context("job not found")?;
    if format == OutputFormat::Text {
        println!("{} {} {}", job.id, job.mode, job.operation);
    }

    let events = EventLog::new(bus.as_ref()).list(&job_id).await?;
    print_events(&events, format);

    let responses = ResponseStore::new(bus.as_ref()).list_for_job(&job_id).await?;
    print_responses(&responses, format);
    Ok(())
}

async fn worker_list(bus: Arc<dyn MessageBus>, clock: fleet_core::SystemClock, format: OutputFormat) -> Result<()> {
    let workers = Registry::new(bus.as_ref()).list_live(&clock).await?;
    print_workers(&workers, format);
    Ok(())
}
