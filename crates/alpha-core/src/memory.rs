//! In-memory store implementations.
//!
//! Used by tests and by callers that do not need durability. Both stores can
//! be switched into an "unavailable" state to exercise persistence failures.

use std::sync::{
  PoisonError, RwLock,
  atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  batch::ValidatedBatch,
  run::{AnalysisRun, RawResponseRecord, ResultRecord, assemble_run},
  store::{AnalysisResultStore, RawResponseStore},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("store unavailable")]
  Unavailable,
}

fn check(flag: &AtomicBool) -> Result<(), MemoryError> {
  if flag.load(Ordering::SeqCst) {
    Err(MemoryError::Unavailable)
  } else {
    Ok(())
  }
}

// ─── Raw responses ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryRawStore {
  rows:        RwLock<Vec<RawResponseRecord>>,
  unavailable: AtomicBool,
}

impl MemoryRawStore {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent call fail with [`MemoryError::Unavailable`].
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }
}

impl RawResponseStore for MemoryRawStore {
  type Error = MemoryError;

  async fn initialize_schema(&self) -> Result<(), MemoryError> {
    check(&self.unavailable)
  }

  async fn append(
    &self,
    batch_id: Uuid,
    batch: &ValidatedBatch,
  ) -> Result<usize, MemoryError> {
    check(&self.unavailable)?;
    let ingested_at = Utc::now();
    let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
    let base = rows.len() as i64;
    for row_index in 0..batch.respondents() {
      rows.push(RawResponseRecord {
        seq: base + row_index as i64 + 1,
        batch_id,
        row_index,
        scores: batch
          .row(row_index)
          .into_iter()
          .map(|(item, v)| (item.to_owned(), v))
          .collect(),
        ingested_at,
      });
    }
    Ok(batch.respondents())
  }

  async fn count(&self) -> Result<u64, MemoryError> {
    check(&self.unavailable)?;
    let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
    Ok(rows.len() as u64)
  }

  async fn batch(&self, batch_id: Uuid) -> Result<Vec<RawResponseRecord>, MemoryError> {
    check(&self.unavailable)?;
    let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
    Ok(rows.iter().filter(|r| r.batch_id == batch_id).cloned().collect())
  }
}

// ─── Analysis results ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryResultStore {
  rows:        RwLock<Vec<ResultRecord>>,
  unavailable: AtomicBool,
}

impl MemoryResultStore {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent call fail with [`MemoryError::Unavailable`].
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }
}

impl AnalysisResultStore for MemoryResultStore {
  type Error = MemoryError;

  async fn initialize_schema(&self) -> Result<(), MemoryError> {
    check(&self.unavailable)
  }

  async fn record(&self, run: &AnalysisRun) -> Result<usize, MemoryError> {
    check(&self.unavailable)?;
    let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
    let base = rows.len() as i64;
    for (i, result) in run.results.iter().enumerate() {
      rows.push(ResultRecord {
        seq:         base + i as i64 + 1,
        run_id:      run.run_id,
        dimension:   result.dimension.clone(),
        item_count:  result.item_count,
        respondents: run.respondents,
        outcome:     result.outcome,
        mean_score:  result.mean_score,
        computed_at: run.computed_at,
      });
    }
    Ok(run.results.len())
  }

  async fn history_page(
    &self,
    before: Option<i64>,
    limit: usize,
  ) -> Result<Vec<ResultRecord>, MemoryError> {
    check(&self.unavailable)?;
    let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
    Ok(
      rows
        .iter()
        .rev()
        .filter(|r| before.is_none_or(|b| r.seq < b))
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn run(&self, run_id: Uuid) -> Result<Option<AnalysisRun>, MemoryError> {
    check(&self.unavailable)?;
    let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
    let matching: Vec<ResultRecord> =
      rows.iter().filter(|r| r.run_id == run_id).cloned().collect();
    Ok(assemble_run(&matching))
  }
}
