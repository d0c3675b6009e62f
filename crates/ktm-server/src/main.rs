//! ktm-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid with
//! `KTM_*` environment variables, opens the SQLite store, and serves the JSON
//! API over HTTP.
//!
//! The schema is never created implicitly. Run it once first:
//!
//! ```
//! ktm-server migrate
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use ktm_server::ServerConfig;
use ktm_store_sqlite::{SCHEMA_VERSION, SqliteStore};
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Kathmandu transparency API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create or upgrade the store schema and exit.
  Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Migrate => {
      store.migrate().await.context("migration failed")?;
      tracing::info!(path = ?store_path, version = SCHEMA_VERSION, "store is up to date");
      Ok(())
    }
    Command::Serve => serve(store, &server_cfg).await,
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let version = store.schema_version().await?;
  if version != SCHEMA_VERSION {
    bail!(
      "store schema is at version {version}, expected {SCHEMA_VERSION}; \
       run `ktm-server migrate` first"
    );
  }

  let app = ktm_server::app(Arc::new(store), server_cfg)
    .context("failed to build application")?;
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(origins = ?server_cfg.cors_origins, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server shut down");
  Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
    _ = terminate => tracing::info!("received SIGTERM, shutting down"),
  }
}
