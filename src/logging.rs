// ABOUTME: Production logging setup with structured output
// ABOUTME: Env-filtered tracing subscriber, plain or JSON formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::env;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` controls filtering (default `info`); setting
/// `MONAY_LOG_FORMAT=json` switches to JSON lines for log shippers.
/// Safe to call once per process; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = env::var("MONAY_LOG_FORMAT").is_ok_and(|format| format == "json");
    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}
