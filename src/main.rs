//! Shell Cache - An offline caching proxy
//!
//! Sits in front of an application origin, pre-caches its shell, and keeps
//! serving it when the origin is unreachable.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shell_cache::{api::create_router, spawn_lifecycle_task, AppState, Config};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build storage, manifest, network and lifecycle controller
/// 4. Bind the listener
/// 5. Start the install/activate lifecycle task
/// 6. Serve until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shell_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shell Cache proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, generation={}{}, port={}, persistent={}",
        config.upstream_url,
        config.cache_prefix,
        config.cache_version,
        config.server_port,
        config.cache_dir.is_some()
    );

    let state = AppState::from_config(&config)
        .await
        .context("failed to initialize proxy state")?;
    let controller = state.controller.clone();

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Proxy listening on http://{}", addr);

    // Until activation completes, requests pass straight through
    let lifecycle_handle = spawn_lifecycle_task(controller);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(lifecycle_handle))
        .await
        .context("server error")?;

    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the lifecycle task if it is still running.
async fn shutdown_signal(lifecycle_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if !lifecycle_handle.is_finished() {
        lifecycle_handle.abort();
        warn!("Lifecycle task aborted before activation completed");
    }
}
