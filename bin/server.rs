// Region Satisfaction - Web Server
// REST API with Axum over the shared region registry

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use region_satisfaction::server::{create_router, AppState};
use region_satisfaction::{Config, RegionRegistry, ResponseAssembler, VariationInjector};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    info!("Loading region data from {}", config.data_dir.display());
    let source = config.registry_source();
    // Initial load reads files synchronously; a failure leaves the registry unloaded
    let registry = tokio::task::spawn_blocking(move || RegionRegistry::open(source))
        .await
        .context("Initial data load task failed")?;

    let assembler = ResponseAssembler::new(
        Arc::new(registry),
        config.snapshot_store(),
        VariationInjector::live(),
    );
    let app = create_router(AppState::new(assembler));

    let address = config.bind_address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
