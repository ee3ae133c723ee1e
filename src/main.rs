use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use bookwarden::admission::AdmissionController;
use bookwarden::auth::{CredentialGate, TokenService};
use bookwarden::config::Config;
use bookwarden::database::SqliteDatabase;
use bookwarden::server::{AppState, Server};

#[derive(Parser, Debug)]
#[command(name = "bookwarden")]
#[command(about = "Book catalog API with per-client admission control")]
#[command(version)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "BOOKWARDEN_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    init_logging(&config);

    // An unusable credential gate must stop the process before it binds
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        database = %config.database.path,
        "Starting bookwarden"
    );

    let database = Arc::new(
        SqliteDatabase::new(&config.database.path)
            .await
            .context("Failed to open database")?,
    );

    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .context("Missing signing secret")?;
    let tokens = TokenService::new(
        secret,
        config.auth.token_ttl_hours,
        config.auth.clock_skew_secs,
    );
    let gate = Arc::new(CredentialGate::new(tokens, Arc::clone(&database)));

    let limiter = Arc::new(AdmissionController::new(config.admission.clone()));
    let sweeper = limiter.start_sweeper();

    let state = AppState {
        gate,
        database,
        limiter,
    };

    let server = Server::new(config.server.clone(), state);
    server.run(shutdown_signal()).await?;

    sweeper.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
