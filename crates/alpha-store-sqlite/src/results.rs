//! [`SqliteResultStore`]: the SQLite implementation of
//! [`AnalysisResultStore`].

use std::path::Path;

use alpha_core::{
  run::{AnalysisRun, ResultRecord, assemble_run},
  store::AnalysisResultStore,
};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{ResultRow, encode_dt, encode_outcome, encode_uuid},
  schema::ANALYSIS_RESULTS,
};

/// Per-dimension analysis results backed by a SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteResultStore {
  conn: tokio_rusqlite::Connection,
}

/// One `analysis_results` row ready for insertion.
struct NewRow {
  position:     i64,
  dimension:    String,
  item_count:   i64,
  alpha:        Option<f64>,
  failure_json: Option<String>,
  mean_score:   Option<f64>,
}

impl SqliteResultStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.initialize_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.initialize_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection, waiting for queued work to finish.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn select(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<ResultRecord>> {
    let raws: Vec<ResultRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), ResultRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(ResultRow::into_record).collect()
  }
}

impl AnalysisResultStore for SqliteResultStore {
  type Error = Error;

  async fn initialize_schema(&self) -> Result<()> {
    ANALYSIS_RESULTS.apply(&self.conn).await
  }

  async fn record(&self, run: &AnalysisRun) -> Result<usize> {
    let run_id_str      = encode_uuid(run.run_id);
    let computed_at_str = encode_dt(run.computed_at);
    let respondents     = run.respondents as i64;

    let rows: Vec<NewRow> = run
      .results
      .iter()
      .enumerate()
      .map(|(i, r)| -> Result<NewRow> {
        let (alpha, failure_json) = encode_outcome(&r.outcome)?;
        Ok(NewRow {
          position: i as i64,
          dimension: r.dimension.clone(),
          item_count: r.item_count as i64,
          alpha,
          failure_json,
          mean_score: r.mean_score,
        })
      })
      .collect::<Result<_>>()?;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO analysis_results (
               run_id, position, dimension_name, item_count, respondents,
               alpha, failure_json, mean_score, computed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          )?;
          for row in &rows {
            written += stmt.execute(rusqlite::params![
              run_id_str,
              row.position,
              row.dimension,
              row.item_count,
              respondents,
              row.alpha,
              row.failure_json,
              row.mean_score,
              computed_at_str,
            ])?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    tracing::debug!(run_id = %run.run_id, rows = written, "analysis run recorded");
    Ok(written)
  }

  async fn history_page(
    &self,
    before: Option<i64>,
    limit: usize,
  ) -> Result<Vec<ResultRecord>> {
    let sql = format!(
      "SELECT {} FROM analysis_results
       WHERE (?1 IS NULL OR row_id < ?1)
       ORDER BY row_id DESC
       LIMIT ?2",
      ResultRow::COLUMNS
    );
    let before = before.map_or(Value::Null, Value::Integer);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self.select(sql, vec![before, Value::Integer(limit)]).await
  }

  async fn run(&self, run_id: Uuid) -> Result<Option<AnalysisRun>> {
    let sql = format!(
      "SELECT {} FROM analysis_results WHERE run_id = ?1 ORDER BY position",
      ResultRow::COLUMNS
    );
    let rows = self
      .select(sql, vec![Value::Text(encode_uuid(run_id))])
      .await?;
    Ok(assemble_run(&rows))
  }
}
