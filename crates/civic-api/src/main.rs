//! Binary entrypoint for the Civic API server.
use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use civic_api::{run, AppState};
use civic_verification::{EngineConfig, VerificationEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("loading engine configuration")?;
    let engine = VerificationEngine::from_config(config).context("building AI provider")?;
    let state = AppState::new(engine).context("registering metrics")?;

    // Default listen address can be overridden with CIVIC_ADDR
    let addr = std::env::var("CIVIC_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    run(&addr, state, shutdown_signal())
        .await
        .with_context(|| format!("serving on {}", addr))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
