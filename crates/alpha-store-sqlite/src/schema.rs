//! SQL schema for the two SQLite stores.
//!
//! Each store owns a fixed DDL block and a version number recorded in the
//! shared `schema_versions` table, so both stores may live in one database
//! file. The DDL is idempotent thanks to `IF NOT EXISTS`; a database carrying
//! a newer version than this crate knows is refused.

use std::time::Duration;

use rusqlite::OptionalExtension as _;

use crate::{Error, Result};

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const COMMON: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_versions (
    component TEXT PRIMARY KEY,
    version   INTEGER NOT NULL
);
";

/// A versioned DDL block owned by one store.
pub struct Schema {
  pub component: &'static str,
  pub version:   i64,
  pub ddl:       &'static str,
}

pub const RAW_RESPONSES: Schema = Schema {
  component: "raw_responses",
  version:   1,
  ddl:       "
-- Raw responses are strictly append-only.
CREATE TABLE IF NOT EXISTS raw_responses (
    row_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id    TEXT    NOT NULL,   -- run id of the ingesting analysis
    row_index   INTEGER NOT NULL,   -- zero-based position in the upload
    scores_json TEXT    NOT NULL,   -- JSON array of [item, score] pairs
    ingested_at TEXT    NOT NULL,   -- ISO 8601 UTC; store-assigned
    UNIQUE (batch_id, row_index)
);

CREATE INDEX IF NOT EXISTS raw_responses_batch_idx ON raw_responses(batch_id);

CREATE TRIGGER IF NOT EXISTS raw_responses_no_update
BEFORE UPDATE ON raw_responses
BEGIN
    SELECT RAISE(ABORT, 'raw_responses is append-only');
END;

CREATE TRIGGER IF NOT EXISTS raw_responses_no_delete
BEFORE DELETE ON raw_responses
BEGIN
    SELECT RAISE(ABORT, 'raw_responses is append-only');
END;

INSERT OR IGNORE INTO schema_versions (component, version)
VALUES ('raw_responses', 1);
",
};

pub const ANALYSIS_RESULTS: Schema = Schema {
  component: "analysis_results",
  version:   1,
  ddl:       "
-- One row per dimension per run. Strictly append-only.
CREATE TABLE IF NOT EXISTS analysis_results (
    row_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id         TEXT    NOT NULL,
    position       INTEGER NOT NULL,   -- dimension order within the run
    dimension_name TEXT    NOT NULL,
    item_count     INTEGER NOT NULL,
    respondents    INTEGER NOT NULL,
    alpha          REAL,               -- NULL when undefined
    failure_json   TEXT,               -- JSON ComputationError when undefined
    mean_score     REAL,
    computed_at    TEXT    NOT NULL,
    UNIQUE (run_id, position),
    CHECK  ((alpha IS NULL) != (failure_json IS NULL))
);

CREATE INDEX IF NOT EXISTS analysis_results_run_idx ON analysis_results(run_id);

CREATE TRIGGER IF NOT EXISTS analysis_results_no_update
BEFORE UPDATE ON analysis_results
BEGIN
    SELECT RAISE(ABORT, 'analysis_results is append-only');
END;

CREATE TRIGGER IF NOT EXISTS analysis_results_no_delete
BEFORE DELETE ON analysis_results
BEGIN
    SELECT RAISE(ABORT, 'analysis_results is append-only');
END;

INSERT OR IGNORE INTO schema_versions (component, version)
VALUES ('analysis_results', 1);
",
};

impl Schema {
  /// Create this store's tables if absent and check the recorded version.
  pub async fn apply(&self, conn: &tokio_rusqlite::Connection) -> Result<()> {
    let component = self.component;
    let ddl = self.ddl;

    let found: Option<i64> = conn
      .call(move |conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(COMMON)?;
        conn.execute_batch(ddl)?;
        Ok(
          conn
            .query_row(
              "SELECT version FROM schema_versions WHERE component = ?1",
              rusqlite::params![component],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match found {
      Some(found) if found > self.version => Err(Error::UnsupportedSchema {
        component,
        found,
        supported: self.version,
      }),
      _ => Ok(()),
    }
  }
}
