use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod media;
mod scan;
mod seed;
mod state;
mod upload;
mod web;

use config::{Cli, Config};
use state::Library;
use web::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli)?;
    tracing::info!(
        backend = %config.storage_backend,
        photos_dir = %config.photos_dir.display(),
        "🎨 Starting photo gallery"
    );

    // The app cannot function without its database
    let library = Library::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;

    if cli.seed {
        seed::seed_library(&library).context("seeding sample photos")?;
    }

    let state = AppState::new(config, library);

    let startup = state.sync().await.context("initial photo sync")?;
    let count = state.library.photo_count()?;
    tracing::info!(
        photos = count,
        added = startup.added,
        removed = startup.removed,
        db = %state.library.path().display(),
        "Library ready"
    );

    let address = state.config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!("Server running on http://{address}");

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
