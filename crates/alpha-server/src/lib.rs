//! Configuration and application assembly for the `alpha-server` binary.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use alpha_api::{ApiState, api_router};
use alpha_core::{analysis::Analyzer, schema::DimensionSchema};
use alpha_store_sqlite::{SqliteRawStore, SqliteResultStore};
use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Items analysed when no schema is configured.
const DEFAULT_ITEMS: [&str; 5] = ["Q1", "Q2", "Q3", "Q4", "Q5"];

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `ALPHA_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// SQLite file holding both the raw responses and the analysis results.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_schema")]
  pub schema:     DimensionSchema,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("alpha.sqlite") }

fn default_schema() -> DimensionSchema { DimensionSchema::whole(DEFAULT_ITEMS) }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `ALPHA_*` environment
  /// variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ALPHA"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

pub type AppState = ApiState<SqliteRawStore, SqliteResultStore>;

/// Open both stores at the configured path and initialise their schemas.
pub async fn open_state(cfg: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
  let store_path = expand_tilde(&cfg.store_path);

  let raw = SqliteRawStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open raw store at {store_path:?}"))?;
  let results = SqliteResultStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open result store at {store_path:?}"))?;

  let analyzer = Analyzer::new(raw, results);
  analyzer
    .initialize()
    .await
    .context("failed to initialise store schemas")?;

  Ok(Arc::new(ApiState {
    analyzer,
    schema: cfg.schema.clone(),
  }))
}

/// Close both stores if `state` is the last reference to them. Returns
/// whether the stores were closed.
pub async fn close_state(state: Arc<AppState>) -> anyhow::Result<bool> {
  match Arc::try_unwrap(state) {
    Ok(state) => {
      let (raw, results) = state.analyzer.into_stores();
      raw.close().await.context("closing raw store")?;
      results.close().await.context("closing result store")?;
      Ok(true)
    }
    Err(state) => {
      tracing::warn!(
        references = Arc::strong_count(&state),
        "application state still shared; stores left open"
      );
      Ok(false)
    }
  }
}

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app(state: Arc<AppState>) -> Router {
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
