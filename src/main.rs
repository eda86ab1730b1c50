//! # Optical Adapter
//!
//! Entry point for the optical device adapter.
//!
//! ## Commands
//!
//! - `simulator`: serve the hardware gateway wire contract from memory
//! - `controller`: reconcile manifest resources continuously against a gateway
//! - `reconcile`: one reconciliation pass, resulting resources on stdout
//!
//! ## Logging
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`), so that
//! `reconcile` output on stdout stays machine readable.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod cli;
mod commands;
mod observability;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    commands::execute_command(cli.command).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
