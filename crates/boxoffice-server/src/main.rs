//! boxoffice server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `BOXOFFICE_*`
//! environment variables, opens the SQLite ledger, optionally seeds the
//! catalog, starts the reservation expiry sweeper and serves the JSON API.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use boxoffice_api::AppState;
use boxoffice_server::{ServerConfig, seed, sweeper::Sweeper};
use boxoffice_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cinema booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// JSON catalog of movies, halls and sessions to load into an empty store.
  #[arg(long)]
  seed: Option<PathBuf>,
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

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Open SQLite store.
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_timeout(config.store_timeout())
    .await
    .context("failed to configure store timeout")?;

  if let Some(path) = cli.seed {
    if store.catalog_is_empty().await? {
      let catalog = seed::Catalog::from_path(&path)
        .await
        .with_context(|| format!("failed to read catalog {path:?}"))?;
      let seeded = seed::load(&store, catalog)
        .await
        .context("failed to seed catalog")?;
      tracing::info!(?seeded, "catalog seeded");
    } else {
      tracing::warn!("store already has a catalog; --seed ignored");
    }
  }

  let store = Arc::new(store);
  let gateway = boxoffice_server::gateway(store.clone(), &config)
    .context("failed to build payment gateway")?;

  // Background sweeper.
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let sweeper = Sweeper::new(
    store.clone(),
    config.booking.expiration_window(),
    config.booking.sweep_interval(),
  );
  let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

  let app = boxoffice_server::app(AppState {
    store,
    gateway: Arc::new(gateway),
  });
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      tracing::info!("shutdown signal received");
    })
    .await
    .context("server error")?;

  let _ = shutdown_tx.send(true);
  let _ = sweeper_task.await;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
