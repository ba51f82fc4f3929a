//! Error type for `alpha-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The database was written by a newer version of this crate.
  #[error("{component} schema version {found} is newer than supported version {supported}")]
  UnsupportedSchema {
    component: &'static str,
    found:     i64,
    supported: i64,
  },

  /// A stored row violates an invariant the schema cannot express.
  #[error("corrupt row {row_id}: {reason}")]
  Corrupt { row_id: i64, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
