//! Error types for `alpha-core`.
//!
//! Validation errors reject a whole batch before anything is persisted.
//! Computation errors are scoped to one dimension and travel inside the run as
//! an explicit "undefined" outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ItemId;

/// Why a [`ResponseBatch`](crate::batch::ResponseBatch) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("required item {item:?} is missing from the batch columns")]
  MissingColumn { item: ItemId },

  #[error("required item {item:?} appears in more than one column")]
  DuplicateColumn { item: ItemId },

  #[error("the batch has no respondent rows")]
  EmptyBatch,

  #[error("row {row} has {found} cells but the batch has {expected} columns")]
  RaggedRow {
    row:      usize,
    expected: usize,
    found:    usize,
  },

  #[error("row {row} has no value for required item {item:?}")]
  MissingValue { item: ItemId, row: usize },

  #[error("row {row}, item {item:?}: {value:?} is not a finite number")]
  NonNumericValue {
    item:  ItemId,
    row:   usize,
    value: String,
  },
}

/// Why a coefficient could not be computed for an item matrix.
///
/// These are recorded per dimension, so they serialise to a stable tagged
/// form that the result store persists verbatim.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationError {
  #[error("at least 2 items are required, found {found}")]
  InsufficientItems { found: usize },

  #[error("at least 2 respondents are required, found {found}")]
  InsufficientSample { found: usize },

  #[error("total score variance is zero; alpha is undefined")]
  ZeroVariance,

  #[error("item columns have unequal lengths")]
  RaggedColumns,

  #[error("scores are too large; the variance is not a finite number")]
  NonFinite,
}

/// Configuration that breaks the dimension partition contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("the schema defines no dimensions")]
  NoDimensions,

  #[error("dimension {0:?} is defined more than once")]
  DuplicateDimension(String),

  #[error("item {item:?} is listed twice in dimension {dimension:?}")]
  RepeatedItem { item: ItemId, dimension: String },

  #[error("item {item:?} belongs to both {first:?} and {second:?}")]
  ItemInMultipleDimensions {
    item:   ItemId,
    first:  String,
    second: String,
  },
}
