//! notekeep HTTP API server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notekeep_api::{app, shutdown::close_within, AppState, Config, StoreBackend};
use notekeep_db::{
    ConnectionMonitor, ConnectionState, Database, MemoryNoteRepository, NoteRepository,
    PoolConfig, PoolMetrics,
};

/// How often pool size and idle counts are logged.
const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FORMAT: "json" or "text" (default "text")
    // LOG_FILE:   optional path, rotated daily
    // LOG_ANSI:   "true"/"false" overrides color detection
    // RUST_LOG:   standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notekeep_api=debug,notekeep_db=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notekeep-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = Config::from_env().context("Invalid server configuration")?;
    info!(
        subsystem = "api",
        environment = %config.environment,
        bind_addr = %config.bind_addr,
        store = ?config.store,
        "Configuration loaded"
    );

    let (notes, connection, database): (Arc<dyn NoteRepository>, ConnectionMonitor, Option<Database>) =
        match &config.store {
            StoreBackend::Memory => {
                warn!(
                    subsystem = "api",
                    "Using the in-memory store; notes are lost on restart"
                );
                (
                    Arc::new(MemoryNoteRepository::new()) as Arc<dyn NoteRepository>,
                    ConnectionMonitor::new(ConnectionState::Connected),
                    None,
                )
            }
            StoreBackend::Postgres(url) => {
                let pool_config =
                    PoolConfig::default().with_max_connections(config.db_max_connections);
                let db = Database::open(url, pool_config)
                    .await
                    .context("Failed to connect to database")?;
                if config.run_migrations {
                    db.migrate().await.context("Failed to run migrations")?;
                }
                (
                    Arc::new(db.notes.clone()) as Arc<dyn NoteRepository>,
                    db.monitor().clone(),
                    Some(db),
                )
            }
        };

    spawn_state_logger(&connection);
    if let Some(db) = &database {
        let pool = db.pool().clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POOL_METRICS_INTERVAL);
            loop {
                ticker.tick().await;
                if pool.is_closed() {
                    break;
                }
                PoolMetrics::of(&pool).log();
            }
        });
    }

    let state = AppState::new(notes, connection, config.environment);
    let router = app(state, config.allowed_origins.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(subsystem = "api", addr = %config.bind_addr, "Server listening");

    // Flips once a shutdown signal arrives; starts the grace timer.
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let grace = config.shutdown_grace;
    let drained = tokio::select! {
        result = std::future::IntoFuture::into_future(server) => {
            result.context("Server error")?;
            info!(subsystem = "api", "In-flight requests drained");
            true
        }
        _ = async {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                subsystem = "api",
                grace_secs = grace.as_secs(),
                "Grace period elapsed with requests still in flight"
            );
            false
        }
    };

    // Abandoned requests still hold pool connections, so close would wait on them.
    if let Some(db) = database {
        let limit = if drained { grace } else { Duration::ZERO };
        close_within(db.close(), limit).await;
    }
    info!(subsystem = "api", "Shutdown complete");
    Ok(())
}

/// Log every store connection state change.
fn spawn_state_logger(connection: &ConnectionMonitor) {
    let mut rx = connection.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            match state {
                ConnectionState::Disconnected => {
                    warn!(subsystem = "database", pool_state = %state, "Store connection lost")
                }
                _ => info!(subsystem = "database", pool_state = %state, "Store connection state"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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
    info!(subsystem = "api", "Shutdown signal received");
}
