//! Handlers for `/analyses` and `/schema`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/analyses` | Body: [`ResponseBatch`]; returns 201 + [`RunView`] |
//! | `GET`  | `/analyses` | Optional `limit` (default 100, max 1000) and `before` |
//! | `GET`  | `/analyses/{run_id}` | A recorded run as [`RunView`] |
//! | `GET`  | `/schema` | The configured [`DimensionSchema`] |

use std::{collections::BTreeMap, sync::Arc};

use alpha_core::{
  analysis::AnalysisError,
  batch::ResponseBatch,
  reliability::Reliability,
  run::{AnalysisRun, ResultRecord},
  schema::DimensionSchema,
  store::{AnalysisResultStore, RawResponseStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// A run plus the conventional reading of each computed coefficient.
#[derive(Debug, Serialize)]
pub struct RunView {
  #[serde(flatten)]
  pub run:         AnalysisRun,
  pub reliability: BTreeMap<String, Reliability>,
}

impl From<AnalysisRun> for RunView {
  fn from(run: AnalysisRun) -> Self {
    let reliability = run
      .results
      .iter()
      .filter_map(|r| Some((r.dimension.clone(), r.outcome.reliability()?)))
      .collect();
    Self { run, reliability }
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /analyses`: analyse and record one batch.
pub async fn create<R, A>(
  State(state): State<Arc<ApiState<R, A>>>,
  Json(batch): Json<ResponseBatch>,
) -> Result<impl IntoResponse, ApiError>
where
  R: RawResponseStore,
  A: AnalysisResultStore,
{
  let run = state.analyzer.run_analysis(&batch, &state.schema).await?;
  Ok((StatusCode::CREATED, Json(RunView::from(run))))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Page size.
  pub limit:  Option<usize>,
  /// Only rows with a sequence number below this one.
  pub before: Option<i64>,
}

/// `GET /analyses[?limit=...][&before=...]`: result rows, newest first.
pub async fn list<R, A>(
  State(state): State<Arc<ApiState<R, A>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ResultRecord>>, ApiError>
where
  R: RawResponseStore,
  A: AnalysisResultStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let rows = state
    .analyzer
    .result_store()
    .history_page(params.before, limit)
    .await
    .map_err(|e| ApiError::Store(AnalysisError::ResultStore(Box::new(e))))?;
  Ok(Json(rows))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /analyses/{run_id}`
pub async fn get_one<R, A>(
  State(state): State<Arc<ApiState<R, A>>>,
  Path(run_id): Path<Uuid>,
) -> Result<Json<RunView>, ApiError>
where
  R: RawResponseStore,
  A: AnalysisResultStore,
{
  let run = state
    .analyzer
    .run(run_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("run {run_id} not found")))?;
  Ok(Json(RunView::from(run)))
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// `GET /schema`
pub async fn schema<R, A>(
  State(state): State<Arc<ApiState<R, A>>>,
) -> Json<DimensionSchema>
where
  R: RawResponseStore,
  A: AnalysisResultStore,
{
  Json(state.schema.clone())
}
