// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the account portal.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use portal_backend_lib::{
    config::Settings,
    router::create_router,
    storage::FlatFileStorage,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "portal-server", about = "Account portal server", version)]
struct Args {
    /// TOML configuration file; defaults to `config.toml` if present
    #[arg(short, long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if settings.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.validate().context("invalid configuration")?;
    init_tracing(&settings);

    let addr = settings.bind_addr()?;
    let cleanup_every = Duration::from_secs(settings.session.cleanup_interval_secs.max(1));
    let storage = FlatFileStorage::new(&settings.storage.path)
        .with_context(|| format!("failed to open storage at {}", settings.storage.path.display()))?;

    let state = Arc::new(AppState::new(storage, settings)?);
    let cleanups = [
        state.sessions.spawn_cleanup(cleanup_every),
        state.rate_limiter.spawn_cleanup(cleanup_every),
        state.flash.spawn_cleanup(cleanup_every),
    ];

    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in cleanups {
        task.abort();
    }
    Ok(())
}
