// ABOUTME: Production logging setup with env-filter controlled verbosity
// ABOUTME: Initializes the tracing subscriber used by the server binary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging for the server process
///
/// Verbosity is controlled by `RUST_LOG` (e.g. `RUST_LOG=quitline_server=debug`),
/// defaulting to `info` for the crate and `warn` elsewhere.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,quitline_server=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
