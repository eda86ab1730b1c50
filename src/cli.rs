//! CLI command definitions using clap.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Optical device adapter
#[derive(Parser, Debug)]
#[command(name = "optical-adapter")]
#[command(version)]
#[command(about = "Drives optical network devices toward their declared configuration")]
#[command(
    long_about = "Reconciles OpticalDevice resources against a hardware gateway, reporting observed bandwidth, laser power and a Ready condition. Also ships a hardware simulator that speaks the gateway wire contract."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the hardware simulator
    Simulator {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        /// Artificial latency added to every call, in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
    },

    /// Run the reconciliation controller until Ctrl+C
    Controller {
        /// YAML manifest with OpticalDevice resources
        #[arg(short, long)]
        manifest: PathBuf,

        /// Base URL of the hardware gateway
        #[arg(short, long)]
        gateway_url: Url,

        /// Reconciler configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of concurrent workers (overrides the config file)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Address for the /metrics and /health endpoints
        #[arg(long, default_value = "127.0.0.1:9090")]
        metrics_listen: SocketAddr,
    },

    /// Reconcile every resource once and print the resulting resources as JSON
    Reconcile {
        /// YAML manifest with OpticalDevice resources
        #[arg(short, long)]
        manifest: PathBuf,

        /// Base URL of the hardware gateway
        #[arg(short, long)]
        gateway_url: Url,

        /// Reconciler configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
