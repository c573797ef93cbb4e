// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messaging substrate: the [`MessageBus`] trait durable consumers and a
//! TTL'd KV store are built on, plus [`InProcessBus`], the single-process
//! reference implementation the bundled binaries and tests run against.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bus;
mod consumer;
mod error;
mod inprocess;

pub use bus::MessageBus;
pub use consumer::{default_backoff, subject_matches, AckPolicy, ConsumerConfig, Delivery};
pub use error::WireError;
pub use inprocess::InProcessBus;
