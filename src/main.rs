use db_healthcheck::api::{self, AppState};
use db_healthcheck::config::Config;
use db_healthcheck::metrics::Metrics;
use db_healthcheck::pool::PostgresPool;

use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present, before anything reads it
    let dotenv_result = dotenvy::dotenv();

    let _guard = init_logging();

    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    let config = Config::from_env()?;
    let socket_addr = config.socket_addr()?;

    info!("Starting health check service on {}", socket_addr);
    info!("Pool max size: {}", config.pool_max_size);
    info!("Pool acquire timeout: {:?}", config.pool_acquire_timeout);
    info!("Health check timeout: {:?}", config.healthcheck_timeout);

    let pool = PostgresPool::new(&config)?;
    pool.warm_up().await;

    let metrics = Arc::new(Metrics::new(&config.metrics_namespace)?);

    let state = AppState {
        pool: Arc::new(pool),
        metrics,
        healthcheck_timeout: config.healthcheck_timeout,
    };

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Console logging always; JSON file logging with daily rotation when
/// `LOG_DIR` is set. The returned guard must live as long as the process.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,db_healthcheck=debug,tower_http=debug"));

    let console = fmt::layer().with_target(true);

    let log_dir = std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty());

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    };

    // Create log directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir, e);
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "db-healthcheck.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", log_dir);

    Some(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
