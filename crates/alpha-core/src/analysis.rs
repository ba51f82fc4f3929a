//! The analyzer: one uploaded batch through validate → persist → compute →
//! persist.
//!
//! Ordering contract:
//!
//! 1. The batch is validated once against every item the schema references.
//!    A validation failure aborts the run and nothing is persisted.
//! 2. The validated rows are appended to the raw store before any coefficient
//!    is computed. If that append fails the run stops there.
//! 3. Each dimension is computed independently; a dimension whose coefficient
//!    is undefined is recorded as such and does not affect the others.
//! 4. The whole run is recorded in the result store as one unit.

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  ValidationError,
  batch::{ResponseBatch, validate},
  reliability::{ItemMatrix, cronbach_alpha, mean_score},
  run::{AnalysisRun, DimensionResult},
  schema::{Dimension, DimensionSchema},
  store::{AnalysisResultStore, History, RawResponseStore},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a run did not complete. Nothing past the failing step was persisted.
#[derive(Debug, Error)]
pub enum AnalysisError {
  #[error("invalid batch: {0}")]
  Validation(#[from] ValidationError),

  /// The raw rows could not be stored; no coefficient was computed.
  #[error("raw response store error: {0}")]
  RawStore(#[source] BoxError),

  /// The raw rows were stored but the run could not be recorded.
  #[error("analysis result store error: {0}")]
  ResultStore(#[source] BoxError),
}

/// Coordinates the validator, the calculator and the two injected stores.
#[derive(Debug)]
pub struct Analyzer<R, A> {
  raw:     R,
  results: A,
}

impl<R, A> Analyzer<R, A>
where
  R: RawResponseStore,
  A: AnalysisResultStore,
{
  pub fn new(raw: R, results: A) -> Self { Self { raw, results } }

  /// Run both stores' idempotent schema initialisation.
  pub async fn initialize(&self) -> Result<(), AnalysisError> {
    self
      .raw
      .initialize_schema()
      .await
      .map_err(|e| AnalysisError::RawStore(Box::new(e)))?;
    self
      .results
      .initialize_schema()
      .await
      .map_err(|e| AnalysisError::ResultStore(Box::new(e)))?;
    Ok(())
  }

  pub fn raw_store(&self) -> &R { &self.raw }

  pub fn result_store(&self) -> &A { &self.results }

  /// Give the stores back, e.g. to close them.
  pub fn into_stores(self) -> (R, A) { (self.raw, self.results) }

  /// Analyse one batch against `schema` and record the run.
  pub async fn run_analysis(
    &self,
    batch: &ResponseBatch,
    schema: &DimensionSchema,
  ) -> Result<AnalysisRun, AnalysisError> {
    let validated = validate(batch, &schema.required_items())?;
    let matrices = schema
      .dimensions()
      .iter()
      .map(|dim| validated.matrix(&dim.items).map(|matrix| (dim, matrix)))
      .collect::<Result<Vec<_>, _>>()?;

    let run_id = Uuid::new_v4();
    let stored = self.raw.append(run_id, &validated).await.map_err(|e| {
      error!(%run_id, error = %e, "failed to store raw responses");
      AnalysisError::RawStore(Box::new(e))
    })?;

    let run = AnalysisRun {
      run_id,
      computed_at: Utc::now(),
      respondents: validated.respondents(),
      results: matrices
        .iter()
        .map(|(dim, matrix)| analyse_dimension(dim, matrix))
        .collect(),
    };

    for (dimension, reason) in run.failures() {
      warn!(%run_id, dimension, %reason, "alpha undefined for dimension");
    }

    self.results.record(&run).await.map_err(|e| {
      error!(%run_id, error = %e, "failed to record analysis run");
      AnalysisError::ResultStore(Box::new(e))
    })?;

    info!(
      %run_id,
      respondents = run.respondents,
      raw_rows = stored,
      dimensions = run.results.len(),
      "analysis run recorded"
    );
    Ok(run)
  }

  /// Most-recent-first walk over every recorded result row.
  pub fn history(&self, page_size: usize) -> History<'_, A> {
    History::new(&self.results, page_size)
  }

  /// Fetch a previously recorded run.
  pub async fn run(&self, run_id: Uuid) -> Result<Option<AnalysisRun>, AnalysisError> {
    self
      .results
      .run(run_id)
      .await
      .map_err(|e| AnalysisError::ResultStore(Box::new(e)))
  }
}

fn analyse_dimension(dim: &Dimension, matrix: &ItemMatrix<'_>) -> DimensionResult {
  DimensionResult {
    dimension:  dim.name.clone(),
    item_count: dim.items.len(),
    outcome:    cronbach_alpha(matrix).into(),
    mean_score: mean_score(matrix),
  }
}
