//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, item
//! scores and computation errors compact JSON.

use alpha_core::{
  ComputationError, ItemId,
  run::{DimensionOutcome, RawResponseRecord, ResultRecord},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_count(row_id: i64, column: &str, v: i64) -> Result<usize> {
  usize::try_from(v).map_err(|_| Error::Corrupt {
    row_id,
    reason: format!("{column} is negative: {v}"),
  })
}

// ─── Scores ──────────────────────────────────────────────────────────────────

pub fn encode_scores(scores: &[(&str, f64)]) -> Result<String> {
  Ok(serde_json::to_string(scores)?)
}

pub fn decode_scores(s: &str) -> Result<Vec<(ItemId, f64)>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Split an outcome into the `alpha` and `failure_json` columns. Exactly one
/// of the two is `Some`.
pub fn encode_outcome(
  outcome: &DimensionOutcome,
) -> Result<(Option<f64>, Option<String>)> {
  Ok(match outcome {
    DimensionOutcome::Computed { alpha } => (Some(*alpha), None),
    DimensionOutcome::Undefined { reason } => {
      (None, Some(serde_json::to_string(reason)?))
    }
  })
}

pub fn decode_outcome(
  row_id: i64,
  alpha: Option<f64>,
  failure: Option<&str>,
) -> Result<DimensionOutcome> {
  match (alpha, failure) {
    (Some(alpha), None) => Ok(DimensionOutcome::Computed { alpha }),
    (None, Some(json)) => {
      let reason: ComputationError = serde_json::from_str(json)?;
      Ok(DimensionOutcome::Undefined { reason })
    }
    _ => Err(Error::Corrupt {
      row_id,
      reason: "exactly one of alpha and failure_json must be set".into(),
    }),
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// Column values as read from `raw_responses`.
pub struct RawResponseRow {
  pub row_id:      i64,
  pub batch_id:    String,
  pub row_index:   i64,
  pub scores_json: String,
  pub ingested_at: String,
}

impl RawResponseRow {
  pub const COLUMNS: &'static str =
    "row_id, batch_id, row_index, scores_json, ingested_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      row_id:      row.get(0)?,
      batch_id:    row.get(1)?,
      row_index:   row.get(2)?,
      scores_json: row.get(3)?,
      ingested_at: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<RawResponseRecord> {
    Ok(RawResponseRecord {
      seq:         self.row_id,
      batch_id:    decode_uuid(&self.batch_id)?,
      row_index:   decode_count(self.row_id, "row_index", self.row_index)?,
      scores:      decode_scores(&self.scores_json)?,
      ingested_at: decode_dt(&self.ingested_at)?,
    })
  }
}

/// Column values as read from `analysis_results`.
pub struct ResultRow {
  pub row_id:         i64,
  pub run_id:         String,
  pub dimension_name: String,
  pub item_count:     i64,
  pub respondents:    i64,
  pub alpha:          Option<f64>,
  pub failure_json:   Option<String>,
  pub mean_score:     Option<f64>,
  pub computed_at:    String,
}

impl ResultRow {
  pub const COLUMNS: &'static str = "row_id, run_id, dimension_name, \
     item_count, respondents, alpha, failure_json, mean_score, computed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      row_id:         row.get(0)?,
      run_id:         row.get(1)?,
      dimension_name: row.get(2)?,
      item_count:     row.get(3)?,
      respondents:    row.get(4)?,
      alpha:          row.get(5)?,
      failure_json:   row.get(6)?,
      mean_score:     row.get(7)?,
      computed_at:    row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<ResultRecord> {
    Ok(ResultRecord {
      seq:         self.row_id,
      run_id:      decode_uuid(&self.run_id)?,
      dimension:   self.dimension_name,
      item_count:  decode_count(self.row_id, "item_count", self.item_count)?,
      respondents: decode_count(self.row_id, "respondents", self.respondents)?,
      outcome:     decode_outcome(
        self.row_id,
        self.alpha,
        self.failure_json.as_deref(),
      )?,
      mean_score:  self.mean_score,
      computed_at: decode_dt(&self.computed_at)?,
    })
  }
}
