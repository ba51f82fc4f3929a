//! [`SqliteRawStore`]: the SQLite implementation of [`RawResponseStore`].

use std::path::Path;

use alpha_core::{
  batch::ValidatedBatch, run::RawResponseRecord, store::RawResponseStore,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawResponseRow, encode_dt, encode_scores, encode_uuid},
  schema::RAW_RESPONSES,
};

/// Raw respondent rows backed by a SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteRawStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteRawStore {
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
}

impl RawResponseStore for SqliteRawStore {
  type Error = Error;

  async fn initialize_schema(&self) -> Result<()> {
    RAW_RESPONSES.apply(&self.conn).await
  }

  async fn append(&self, batch_id: Uuid, batch: &ValidatedBatch) -> Result<usize> {
    let batch_id_str = encode_uuid(batch_id);
    let at_str = encode_dt(Utc::now());
    let rows: Vec<(i64, String)> = (0..batch.respondents())
      .map(|i| encode_scores(&batch.row(i)).map(|json| (i as i64, json)))
      .collect::<Result<_>>()?;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO raw_responses (batch_id, row_index, scores_json, ingested_at)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (row_index, scores_json) in &rows {
            written +=
              stmt.execute(rusqlite::params![batch_id_str, row_index, scores_json, at_str])?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    tracing::debug!(%batch_id, rows = written, "raw responses appended");
    Ok(written)
  }

  async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM raw_responses", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n.unsigned_abs())
  }

  async fn batch(&self, batch_id: Uuid) -> Result<Vec<RawResponseRecord>> {
    let batch_id_str = encode_uuid(batch_id);

    let raws: Vec<RawResponseRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM raw_responses WHERE batch_id = ?1 ORDER BY row_index",
          RawResponseRow::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![batch_id_str], RawResponseRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResponseRow::into_record).collect()
  }
}
