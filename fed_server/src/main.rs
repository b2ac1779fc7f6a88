//! Federation tournament server.
//!
//! Serves the tournament REST API backed by PostgreSQL, or by process memory
//! for local use.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use fed_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use federation::{TournamentManager, db::Database};
use pico_args::Arguments;
use std::sync::Arc;
use tracing::info;

const HELP: &str = "\
Run the federation tournament server

USAGE:
  fed_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep tournaments in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          postgres (default) or memory
  DATABASE_URL             PostgreSQL connection string
  APPLY_SCHEMA             Create missing tables on startup (true/false)
  METRICS_BIND             Prometheus exporter address (e.g., 0.0.0.0:9090)
  ORGANIZER_TOKEN_SHA256   Hex SHA-256 of the token required for changes
  DEFAULT_SEEDING_POLICY   ranking, random or registration_order
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
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
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;
    info!(
        bind = %config.bind,
        storage = %config.storage,
        organizer_token = config.organizer_token_sha256.is_some(),
        "Configuration loaded"
    );

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", metrics_bind);
    }

    let (manager, database) = match (config.storage, &config.database) {
        (StorageBackend::Postgres, Some(db_config)) => {
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            info!("Database connected successfully");

            if config.apply_schema {
                db.apply_schema().await.context("Failed to apply schema")?;
                info!("Database schema applied");
            }

            let manager = TournamentManager::with_pool(Arc::new(db.pool().clone()));
            (manager, Some(db))
        }
        _ => {
            tracing::warn!("Using in-memory storage; tournaments are lost on shutdown");
            (TournamentManager::in_memory(), None)
        }
    };

    let app = api::create_router(api::AppState::new(manager, &config));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
