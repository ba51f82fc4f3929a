//! The two store traits and the history cursor.
//!
//! The traits are implemented by storage backends (e.g. `alpha-store-sqlite`)
//! and by the in-memory fakes in [`crate::memory`]. The analyzer depends on
//! these abstractions, never on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  batch::ValidatedBatch,
  run::{AnalysisRun, RawResponseRecord, ResultRecord},
};

// ─── Raw responses ───────────────────────────────────────────────────────────

/// Append-only provenance store for validated respondent rows.
///
/// No update or delete operation exists. Each `append` is one transaction:
/// either every row of the batch is stored or none is.
pub trait RawResponseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the backing structure if absent. Safe to call on every start.
  fn initialize_schema(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store every row of `batch` under `batch_id`; returns the rows written.
  fn append<'a>(
    &'a self,
    batch_id: Uuid,
    batch: &'a ValidatedBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Total number of stored rows.
  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// All rows ingested under `batch_id`, in upload order.
  fn batch(
    &self,
    batch_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RawResponseRecord>, Self::Error>> + Send + '_;
}

// ─── Analysis results ────────────────────────────────────────────────────────

/// Append-only store of per-dimension results.
///
/// Recorded rows are never altered, so history read at time T is a suffix of
/// history read at any later time.
pub trait AnalysisResultStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the backing structure if absent. Safe to call on every start.
  fn initialize_schema(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append one row per dimension result of `run`, atomically. Returns the
  /// rows written.
  fn record<'a>(
    &'a self,
    run: &'a AnalysisRun,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Up to `limit` rows, most recent first, whose `seq` is strictly below
  /// `before` (or the newest rows when `before` is `None`).
  fn history_page(
    &self,
    before: Option<i64>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ResultRecord>, Self::Error>> + Send + '_;

  /// Reassemble a recorded run. Returns `None` if the id is unknown.
  fn run(
    &self,
    run_id: Uuid,
  ) -> impl Future<Output = Result<Option<AnalysisRun>, Self::Error>> + Send + '_;
}

// ─── History cursor ──────────────────────────────────────────────────────────

/// A lazy, most-recent-first walk over an [`AnalysisResultStore`].
///
/// Pages are fetched on demand with keyset pagination on `seq`, so rows
/// recorded after the walk started never appear mid-walk and no row is seen
/// twice. [`History::rewind`] restarts from the newest row.
pub struct History<'a, S: ?Sized> {
  store:     &'a S,
  page_size: usize,
  cursor:    Option<i64>,
  exhausted: bool,
}

impl<'a, S> History<'a, S>
where
  S: AnalysisResultStore + ?Sized,
{
  pub fn new(store: &'a S, page_size: usize) -> Self {
    Self {
      store,
      page_size: page_size.max(1),
      cursor: None,
      exhausted: false,
    }
  }

  /// The next page, or `None` once every row has been returned.
  pub async fn next_page(&mut self) -> Result<Option<Vec<ResultRecord>>, S::Error> {
    if self.exhausted {
      return Ok(None);
    }
    let page = self.store.history_page(self.cursor, self.page_size).await?;
    if page.len() < self.page_size {
      self.exhausted = true;
    }
    match page.last() {
      Some(last) => {
        self.cursor = Some(last.seq);
        Ok(Some(page))
      }
      None => Ok(None),
    }
  }

  pub fn rewind(&mut self) {
    self.cursor = None;
    self.exhausted = false;
  }

  /// Drain the remaining pages into one vector.
  pub async fn collect_all(mut self) -> Result<Vec<ResultRecord>, S::Error> {
    let mut rows = Vec::new();
    while let Some(page) = self.next_page().await? {
      rows.extend(page);
    }
    Ok(rows)
  }
}
