// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet CLI (fleet-cli)
//!
//! Operator surface over the dispatch/storage layers. In a real deployment
//! this binary would connect to the shared message bus a fleet's agents
//! also connect to; this reference build only ships [`fleet_wire::InProcessBus`],
//! so state is process-local — use `--embedded-workers` to stand up a
//! throwaway local fleet for the duration of one command.

mod commands;
mod embedded;
mod output;

use clap::Parser;
use commands::Command;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "fleet-cli", version, about = "Operator CLI for the worker fleet dispatch plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))).init();

    let cli = Cli::parse();
    commands::run(cli.command, cli.format).await
}
