//! `ktm-ingest`: load project records from a CSV file into the store.
//!
//! # Usage
//!
//! ```
//! ktm-ingest data/kathmandu_valley_projects.csv --store ktm.sqlite3
//! ```
//!
//! The store must already be migrated (`ktm-server migrate`).

use std::{fs::File, path::PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use ktm_store_sqlite::{SCHEMA_VERSION, SqliteStore};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ktm-ingest", about = "Ingest project records into the transparency store")]
struct Args {
  /// CSV file with one project per row.
  #[arg(default_value = "data/kathmandu_valley_projects.csv")]
  source: PathBuf,

  /// Path to the SQLite store.
  #[arg(long, env = "KTM_STORE_PATH", default_value = "ktm.sqlite3")]
  store: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let store = SqliteStore::open(&args.store)
    .await
    .with_context(|| format!("failed to open store at {:?}", args.store))?;
  let version = store.schema_version().await?;
  if version != SCHEMA_VERSION {
    bail!(
      "store schema is at version {version}, expected {SCHEMA_VERSION}; \
       run `ktm-server migrate` first"
    );
  }

  let file = File::open(&args.source)
    .with_context(|| format!("reading source file {}", args.source.display()))?;

  tracing::info!(source = %args.source.display(), "starting ingest");
  let summary = ktm_ingest::ingest(&store, file)
    .await
    .context("ingest aborted")?;

  println!(
    "Ingest complete: {} inserted, {} skipped.",
    summary.inserted, summary.skipped
  );
  Ok(())
}
