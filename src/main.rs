// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::Client;
use routedns::{
    cluster::{ClusterApi, KubeCluster},
    config::Config,
    context::{Context, Settings},
    ddns::{HttpAddressLookup, PublicAddressDetector},
    health,
    provider::{cloudflare::CloudflareProvider, RecordManager},
    reconcilers::Reconciler,
    retry::ReconnectPolicy,
    shutdown,
    ticker::TickerDriver,
    watcher::WatchDriver,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("routedns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // Respects RUST_LOG (default info) and RUST_LOG_FORMAT (json or text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_tracing();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;
    info!(config = ?config, "Starting routedns controller");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    let cluster: Arc<dyn ClusterApi> = Arc::new(KubeCluster::new(client));

    let provider = CloudflareProvider::new(
        &config.cloudflare_api_token,
        &config.cloudflare_api_url,
        config.provider_timeout(),
    )?;
    let lookup = HttpAddressLookup::new(
        config.ipv4_lookup_url.clone(),
        config.ipv6_lookup_url.clone(),
        config.lookup_timeout(),
    )?;

    let ctx = Arc::new(Context::new(
        cluster.clone(),
        RecordManager::new(Arc::new(provider), config.record_owner_id.clone()),
        PublicAddressDetector::new(Arc::new(lookup)),
        Settings::from(&config),
    ));
    let reconciler = Reconciler::new(ctx);

    let listener = TcpListener::bind(config.health_addr)
        .await
        .with_context(|| format!("failed to bind health server on {}", config.health_addr))?;

    let (stop_tx, stop_rx) = shutdown::channel();

    let mut health_server = tokio::spawn(health::serve(listener, stop_rx.clone()));
    let watch_driver = WatchDriver::new(
        cluster,
        reconciler.clone(),
        ReconnectPolicy::fixed(config.watch_reconnect_delay()),
        config.shutdown_timeout(),
    );
    let watch_task = tokio::spawn(watch_driver.run(stop_rx.clone()));
    let ticker_task =
        tokio::spawn(TickerDriver::new(reconciler, config.sweep_interval()).run(stop_rx));

    info!("Controller running");

    let health_failed = tokio::select! {
        () = shutdown::signal() => false,
        result = &mut health_server => {
            error!(result = ?result, "Health server exited unexpectedly");
            true
        }
    };

    info!("Shutting down");
    let _ = stop_tx.send(true);

    let drivers = async {
        let _ = watch_task.await;
        let _ = ticker_task.await;
    };
    // The watch driver drains within shutdown_timeout; allow a second on top.
    let budget = config.shutdown_timeout() + std::time::Duration::from_secs(1);
    if tokio::time::timeout(budget, drivers).await.is_err() {
        warn!("Drivers did not stop within the shutdown timeout");
    }

    if health_failed {
        anyhow::bail!("health server exited unexpectedly");
    }
    match tokio::time::timeout(config.shutdown_timeout(), health_server).await {
        Ok(Ok(Err(e))) => warn!(error = %e, "Health server stopped with an error"),
        Ok(_) => {}
        Err(_) => warn!("Health server did not stop within the shutdown timeout"),
    }

    info!("Shutdown complete");
    Ok(())
}
