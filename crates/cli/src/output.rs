// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use fleet_core::{Response, StatusEvent, WorkerRegistration};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_job_submitted(job_id: &fleet_core::JobId, expected_responses: usize, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("submitted {job_id} (expecting {expected_responses} response(s))"),
        OutputFormat::Json => print_json(&serde_json::json!({ "job_id": job_id.to_string(), "expected_responses": expected_responses })),
    }
}

pub fn print_events(events: &[StatusEvent], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if events.is_empty() {
                println!("(no events)");
            }
            for event in events {
                match &event.error {
                    Some(err) => println!("{:>4}  {:<12} {}  {}", event.sequence, event.kind, event.worker, err),
                    None => println!("{:>4}  {:<12} {}", event.sequence, event.kind, event.worker),
                }
            }
        }
        OutputFormat::Json => print_json(events),
    }
}

pub fn print_responses(responses: &[Response], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if responses.is_empty() {
                println!("(no responses yet)");
            }
            for response in responses {
                let status = if response.ok { "ok" } else { "failed" };
                println!("{:<20} {:<7} changed={}", response.worker, status, response.changed);
                if let Some(err) = &response.error {
                    println!("    error: {err}");
                } else if !response.data.is_null() {
                    println!("    {}", response.data);
                }
            }
        }
        OutputFormat::Json => print_json(responses),
    }
}

pub fn print_workers(workers: &[WorkerRegistration], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if workers.is_empty() {
                println!("(no live workers)");
            }
            for worker in workers {
                let labels: Vec<String> = worker.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!("{:<20} {}", worker.hostname, labels.join(","));
            }
        }
        OutputFormat::Json => print_json(workers),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("error: failed to encode output as JSON: {err}"),
    }
}
