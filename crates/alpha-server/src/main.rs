//! alpha-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! stores, and serves the JSON API over HTTP until interrupted.

use std::path::PathBuf;

use alpha_server::{ServerConfig, app, close_state, open_state};
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cronbach's alpha analysis server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the resolved dimension schema and exit.
  #[arg(long)]
  print_schema: bool,
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
  let server_cfg = ServerConfig::load(&cli.config)?;

  if cli.print_schema {
    for dim in server_cfg.schema.dimensions() {
      println!("{}: {}", dim.name, dim.items.join(", "));
    }
    return Ok(());
  }

  let state = open_state(&server_cfg).await?;
  tracing::info!(
    dimensions = server_cfg.schema.dimensions().len(),
    store = %server_cfg.store_path.display(),
    "stores ready"
  );

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state.clone()))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router has been dropped; release the connections explicitly.
  close_state(state).await?;
  tracing::info!("shut down");

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}
