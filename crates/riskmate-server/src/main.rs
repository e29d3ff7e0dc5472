//! Riskmate Server - Main entry point

use anyhow::Result;
use riskmate_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use riskmate_server::{
    audit::PgAuditSink,
    config::Config,
    create_router,
    storage::{Storage, StorageConfig},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::for_binary("riskmate-server")
        .with_filter("riskmate_server=debug,tower_http=debug,sqlx=warn")
        .apply_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Riskmate server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    let storage = Storage::new(StorageConfig::from_env()?).await?;

    let state = AppState {
        db: db_pool.clone(),
        storage,
        auth: Arc::new(config.auth.clone()),
        uploads: config.uploads.clone(),
        audit_sink: Arc::new(PgAuditSink::new(db_pool)),
    };

    let app = create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then give in-flight requests a moment
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    info!(timeout_secs, "Draining connections");
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
