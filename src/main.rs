use anyhow::{Context, Result};
use clap::Parser;
use orm_scaffold::{build_router, config::AppConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Serves the scaffold screens of a directory of model definitions.
#[derive(Debug, Parser)]
#[command(name = "orm-scaffold", version, about)]
struct Cli {
    /// Directory of the JSON model definitions, overrides SCAFFOLD_MODELS_DIR
    #[arg(short, long)]
    models: Option<PathBuf>,

    /// Port to listen on, overrides APP_PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("failed to load application configuration")?;
    if let Some(models) = cli.models {
        config.models_dir = models;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let state = config.build_state()?;
    info!(models = state.orm.models().len(), locale = %state.i18n.default_locale(), "models loaded");

    let app = build_router(state);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "orm scaffold started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("orm_scaffold=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
