use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontdesk::cli::{run_command, Cli};
use frontdesk::config::Config;
use frontdesk::engine::spawn_roster_task;
use frontdesk::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Client subcommands talk to a running server
    if cli.command.is_some() {
        return run_command(&cli).await;
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting frontdesk v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    frontdesk::utils::ensure_dir(&config.server.data_dir)?;

    // Initialize database
    let db = frontdesk::db::init(&config.server.data_dir).await?;

    // Ensure the admin account exists
    frontdesk::db::ensure_admin_user(&db, &config.auth.admin_username, &config.auth.admin_password)
        .await?;

    if config.booking.seed_sample_data {
        frontdesk::db::seed_sample_data(&db).await?;
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), db.clone()));

    // Keep the doctor roster snapshot fresh
    spawn_roster_task(db, state.roster.clone(), config.booking.roster_refresh_secs);

    let app = frontdesk::api::create_router(state);

    // Start API server
    let api_addr = format!("{}:{}", config.server.host, config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;

    tracing::info!("API server listening on http://{}", api_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
