//! Court booking server.
//!
//! Serves the booking engine over HTTP, backed by PostgreSQL or by an
//! in-memory store, and periodically closes elapsed reservations.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use pico_args::Arguments;
use turnero::Engine;
use turnero_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics, tasks,
};

const HELP: &str = "\
Run the turnero court booking server

USAGE:
  turnero_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     postgres | memory           [default: env TURNERO_STORAGE or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  TURNERO_STORAGE          Storage backend
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  CLOSURE_INTERVAL_SECS    Period for closing elapsed reservations [default: 60]
  PAGO_EXPIRATION_MINUTES  Lifetime of an iniciado pago, 0 disables [default: 30]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str("--storage")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.storage)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics exposed at http://{}/metrics", addr);
    }

    let engine = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database");
            Engine::connect(&config.database, config.engine.clone())
                .await
                .context("Failed to connect to database")?
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Engine::in_memory(config.engine.clone())
        }
    };
    tracing::info!("Engine ready on {} storage", engine.backend());

    let closure = tasks::spawn_closure_task(engine.clone(), config.closure_interval);

    let app = api::create_router(api::AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    closure.abort();
    tracing::info!("Shutting down server...");

    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
