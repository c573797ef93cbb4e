// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet Agent (fleet-agent)
//!
//! Runs on a single node, registers into the fleet, and executes jobs
//! dispatched to it over the message bus.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod fabric;
mod heartbeat;
mod runtime;
mod worker;

use std::sync::Arc;

use fleet_core::SystemClock;
use fleet_providers::{NodeProvider, NodeProviderFactory};
use fleet_wire::InProcessBus;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use runtime::AgentRuntime;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fleet-agent {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fleet-agent {}", env!("CARGO_PKG_VERSION"));
                println!("Registers this node into the fleet and executes dispatched jobs.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fleet-agent [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let hostname = match env::hostname_override() {
        Some(hostname) => hostname,
        None => NodeProviderFactory::for_platform().hostname().await.unwrap_or_else(|_| "unknown-host".to_string()),
    };
    let labels = env::labels();

    let bus: Arc<dyn fleet_wire::MessageBus> = Arc::new(InProcessBus::new());
    let clock = SystemClock;

    let runtime = AgentRuntime::register_and_build(bus, clock, hostname, labels).await?;
    let shutdown = runtime.shutdown_handle();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        shutdown.cancel();
    });

    info!("fleet-agent ready");
    if let Err(err) = runtime.run().await {
        error!(error = %err, "agent runtime exited with an error");
        return Err(Box::new(err));
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
