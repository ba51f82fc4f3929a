//! Analysis runs and the records the two stores hand back.
//!
//! A run is immutable once created and is the atomic unit of persistence: the
//! result store writes all of its dimension rows together or none of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ComputationError, ItemId, reliability::Reliability};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// The coefficient for one dimension, or the reason it is undefined.
///
/// An undefined outcome is never represented as NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionOutcome {
  Computed { alpha: f64 },
  Undefined { reason: ComputationError },
}

impl DimensionOutcome {
  pub fn alpha(&self) -> Option<f64> {
    match self {
      Self::Computed { alpha } => Some(*alpha),
      Self::Undefined { .. } => None,
    }
  }

  pub fn reliability(&self) -> Option<Reliability> {
    self.alpha().map(Reliability::from_alpha)
  }
}

impl From<Result<f64, ComputationError>> for DimensionOutcome {
  fn from(r: Result<f64, ComputationError>) -> Self {
    match r {
      Ok(alpha) => Self::Computed { alpha },
      Err(reason) => Self::Undefined { reason },
    }
  }
}

/// One dimension's entry in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
  pub dimension:  String,
  pub item_count: usize,
  pub outcome:    DimensionOutcome,
  /// Mean of the respondents' average item score on this dimension.
  pub mean_score: Option<f64>,
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// One execution of the pipeline over one uploaded batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
  pub run_id:      Uuid,
  pub computed_at: DateTime<Utc>,
  pub respondents: usize,
  /// Results in schema order.
  pub results:     Vec<DimensionResult>,
}

impl AnalysisRun {
  pub fn result(&self, dimension: &str) -> Option<&DimensionResult> {
    self.results.iter().find(|r| r.dimension == dimension)
  }

  /// Dimensions whose coefficient could not be computed.
  pub fn failures(&self) -> impl Iterator<Item = (&str, ComputationError)> {
    self.results.iter().filter_map(|r| match r.outcome {
      DimensionOutcome::Undefined { reason } => {
        Some((r.dimension.as_str(), reason))
      }
      DimensionOutcome::Computed { .. } => None,
    })
  }
}

// ─── Persisted records ───────────────────────────────────────────────────────

/// One row of the analysis result store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
  /// Store-assigned, strictly increasing in insertion order.
  pub seq:         i64,
  pub run_id:      Uuid,
  pub dimension:   String,
  pub item_count:  usize,
  pub respondents: usize,
  pub outcome:     DimensionOutcome,
  pub mean_score:  Option<f64>,
  pub computed_at: DateTime<Utc>,
}

/// One respondent row of the raw response store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponseRecord {
  pub seq:         i64,
  /// The run id of the analysis that ingested this row.
  pub batch_id:    Uuid,
  /// Zero-based position of the row within its upload.
  pub row_index:   usize,
  pub scores:      Vec<(ItemId, f64)>,
  pub ingested_at: DateTime<Utc>,
}

/// Rebuild a run from its persisted rows. The rows must all belong to the same
/// run and be in recording order; returns `None` for an empty slice.
pub fn assemble_run(rows: &[ResultRecord]) -> Option<AnalysisRun> {
  let first = rows.first()?;
  Some(AnalysisRun {
    run_id:      first.run_id,
    computed_at: first.computed_at,
    respondents: first.respondents,
    results:     rows
      .iter()
      .map(|r| DimensionResult {
        dimension:  r.dimension.clone(),
        item_count: r.item_count,
        outcome:    r.outcome,
        mean_score: r.mean_score,
      })
      .collect(),
  })
}
