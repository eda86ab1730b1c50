//! CLI command handlers.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use optical_core::load_manifest;
use optical_gateway::{DeviceRecordStore, FaultModel, HttpGateway, SimulatedGateway, server};
use optical_reconciler::{
    InMemoryResourceClient, Reconciler, ReconcilerConfig, ReconcilerMetrics, ReconciliationLoop,
    ResourceClient,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::cli::Commands;
use crate::observability;

/// Execute a CLI command.
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Simulator { listen, latency_ms } => cmd_simulator(listen, latency_ms).await,

        Commands::Controller {
            manifest,
            gateway_url,
            config,
            workers,
            metrics_listen,
        } => cmd_controller(manifest, gateway_url, config, workers, metrics_listen).await,

        Commands::Reconcile {
            manifest,
            gateway_url,
            config,
        } => cmd_reconcile(manifest, gateway_url, config).await,
    }
}

async fn cmd_simulator(listen: SocketAddr, latency_ms: u64) -> Result<()> {
    let faults = FaultModel::new().with_latency(Duration::from_millis(latency_ms));
    let gateway = Arc::new(SimulatedGateway::with_faults(
        Arc::new(DeviceRecordStore::new()),
        faults,
    ));
    let shutdown = CancellationToken::new();

    let mut server = tokio::spawn(server::run_server(listen, gateway, shutdown.clone()));

    tokio::select! {
        joined = &mut server => {
            joined
                .context("Simulator task failed")?
                .with_context(|| format!("Simulator could not serve on {listen}"))?;
            return Ok(());
        }
        () = wait_for_shutdown() => {}
    }

    shutdown.cancel();
    server
        .await
        .context("Simulator task failed")?
        .context("Simulator server failed")?;
    info!("Simulator stopped");
    Ok(())
}

async fn cmd_controller(
    manifest: PathBuf,
    gateway_url: Url,
    config: Option<PathBuf>,
    workers: Option<usize>,
    metrics_listen: SocketAddr,
) -> Result<()> {
    let config = load_config(config.as_deref(), workers)?;
    let client = load_resources(&manifest).await?;
    let metrics = Arc::new(ReconcilerMetrics::new()?);
    let reconciler = build_reconciler(&client, gateway_url, Arc::clone(&metrics), config)?;

    let reconciliation = Arc::new(ReconciliationLoop::new(reconciler, client));
    let shutdown = CancellationToken::new();

    let metrics_server = tokio::spawn(observability::serve(
        metrics_listen,
        metrics,
        shutdown.clone(),
    ));
    let runner = {
        let reconciliation = Arc::clone(&reconciliation);
        tokio::spawn(async move { reconciliation.run().await })
    };

    info!("Controller running. Press Ctrl+C to stop.");
    wait_for_shutdown().await;

    info!("Cleaning up...");
    reconciliation.stop();
    shutdown.cancel();

    runner
        .await
        .context("Reconciliation loop task failed")?
        .context("Reconciliation loop failed")?;
    if let Err(e) = metrics_server.await.context("Metrics task failed")? {
        warn!(error = %e, "Metrics endpoint exited with error");
    }

    info!("Controller stopped gracefully");
    Ok(())
}

async fn cmd_reconcile(manifest: PathBuf, gateway_url: Url, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref(), None)?;
    let client = load_resources(&manifest).await?;
    let metrics = Arc::new(ReconcilerMetrics::new()?);
    let reconciler = build_reconciler(&client, gateway_url, metrics, config)?;

    let cancel = CancellationToken::new();
    let keys = client.list_keys().await?;
    let mut failed = 0usize;
    for key in &keys {
        match reconciler.reconcile(key, &cancel).await {
            Ok(action) => info!(key = %key, action = %action, "Reconciled"),
            Err(e) => {
                failed = failed.saturating_add(1);
                warn!(key = %key, error = %e, "Reconciliation failed");
            }
        }
    }

    let devices = client.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&devices)?);

    if failed > 0 {
        bail!("{failed} of {} resources failed to reconcile", keys.len());
    }
    Ok(())
}

fn load_config(path: Option<&Path>, workers: Option<usize>) -> Result<ReconcilerConfig> {
    let config = match path {
        Some(path) => ReconcilerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReconcilerConfig::default(),
    };
    let config = match workers {
        Some(workers) => config.with_workers(workers),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

async fn load_resources(manifest: &Path) -> Result<Arc<InMemoryResourceClient>> {
    let devices = load_manifest(manifest)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    if devices.is_empty() {
        warn!(manifest = %manifest.display(), "Manifest contains no resources");
    }

    let client = Arc::new(InMemoryResourceClient::new());
    for device in devices {
        client.apply(device).await;
    }
    info!(count = client.list_keys().await?.len(), "Resources loaded");
    Ok(client)
}

fn build_reconciler(
    client: &Arc<InMemoryResourceClient>,
    gateway_url: Url,
    metrics: Arc<ReconcilerMetrics>,
    config: ReconcilerConfig,
) -> Result<Arc<Reconciler>> {
    let gateway = HttpGateway::new(gateway_url, config.gateway_timeout())
        .context("Failed to create gateway client")?;
    info!(gateway = %gateway.base(), "Using hardware gateway");

    Ok(Arc::new(Reconciler::new(
        Arc::clone(client) as Arc<dyn ResourceClient>,
        Arc::new(gateway),
        metrics,
        config,
    )))
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_load_config_defaults_and_override() {
        let config = load_config(None, Some(2)).unwrap();
        assert_eq!(config.workers, 2);
        assert!(load_config(None, Some(0)).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Some(Path::new("/nonexistent/reconciler.toml")), None).is_err());
    }

    #[tokio::test]
    async fn test_load_resources_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.yaml");
        std::fs::write(
            &path,
            "metadata:\n  name: test-device\nspec:\n  controllerConfig:\n    hostname: laser-a1.site1\n    port: 830\n  parameters:\n    bandwidth: 100Gbps\n    laserPower: 15dBm\n",
        )
        .unwrap();

        let client = load_resources(&path).await.unwrap();
        let devices = client.snapshot().await;

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].metadata.generation, 1);
    }
}
