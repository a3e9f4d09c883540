//! classbook server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! session ledger and serves the JSON API over HTTP.
//!
//! # Loading reference data
//!
//! Teaching plans, groups and curriculum topics come from a JSON document:
//!
//! ```text
//! classbook import-reference reference.json
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use classbook_core::reference::ReferenceData;
use classbook_server::{ServerConfig, load_config};
use classbook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Classbook session ledger server")]
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
  /// Upsert teaching plans, groups, sub-topics and lessons from a JSON file.
  ImportReference {
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = load_config(&cli.config).context("failed to load configuration")?;

  let store_path = cfg.resolved_store_path();
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, store).await,
    Command::ImportReference { file } => import(&store, file).await,
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let app = classbook_server::router(Arc::new(store));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn import(store: &SqliteStore, file: PathBuf) -> anyhow::Result<()> {
  let text = tokio::fs::read_to_string(&file)
    .await
    .with_context(|| format!("failed to read {file:?}"))?;
  let data: ReferenceData =
    serde_json::from_str(&text).with_context(|| format!("failed to parse {file:?}"))?;

  let counts = store
    .import_reference(data)
    .await
    .context("failed to import reference data")?;
  println!(
    "imported {} teaching plans, {} groups ({} members), {} sub-topics, {} lessons",
    counts.teaching_plans, counts.groups, counts.members, counts.sub_topics, counts.lessons
  );
  Ok(())
}
