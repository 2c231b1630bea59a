use status_relay::config::{Config, StoreKind};
use status_relay::serializer::UpdateSerializer;
use status_relay::status::server::build_router;
use status_relay::storage::{MemoryStore, RemoteStore, StatusStore};

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // 1. Store backend:
    let store: Arc<dyn StatusStore> = match config.store {
        StoreKind::Memory => {
            tracing::info!("Using memory store (failure rate {})", config.failure_rate);
            Arc::new(MemoryStore::with_failure_rate(config.failure_rate))
        }
        StoreKind::Remote => {
            let url = config
                .remote_url
                .as_deref()
                .context("--remote-url is required with --store remote")?;
            tracing::info!("Using remote store at {}", url);
            Arc::new(RemoteStore::new(url, config.remote_timeout()))
        }
    };

    // 2. Serializer:
    let (serializer, handle) = UpdateSerializer::new(store, config.serializer());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let serializer_task = tokio::spawn(serializer.run(async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    }));

    // 3. HTTP server:
    let app = build_router(handle);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutdown requested");
        })
        .await
        .context("http server runtime failure")?;

    // 4. Stop the serializer once no more requests can arrive:
    let _ = shutdown_tx.send(true);
    let state = serializer_task
        .await
        .context("serializer task failed")?;
    tracing::info!(
        "Final stats: {} committed, {} pending, {} accepted, {} discarded",
        state.stats.committed,
        state.stats.pending,
        state.stats.accepted,
        state.stats.discarded
    );

    Ok(())
}
