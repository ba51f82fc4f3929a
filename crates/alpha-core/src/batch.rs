//! Response batches and the validator that turns them into numeric matrices.
//!
//! A [`ResponseBatch`] arrives from the file-parsing collaborator with named
//! columns and loosely-typed cells. [`validate`] narrows it to the required
//! items, coerces every cell to a finite `f64`, and keeps the original row
//! order so the raw store mirrors the upload.

use serde::{Deserialize, Serialize};

use crate::{ItemId, ValidationError, reliability::ItemMatrix};

// ─── Input ───────────────────────────────────────────────────────────────────

/// One cell of an uploaded response table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
  Number(f64),
  /// Text that may still hold a number, e.g. `"4"` from a spreadsheet.
  Text(String),
  Empty,
}

impl From<f64> for CellValue {
  fn from(v: f64) -> Self { Self::Number(v) }
}

impl From<i32> for CellValue {
  fn from(v: i32) -> Self { Self::Number(f64::from(v)) }
}

impl From<&str> for CellValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

/// Outcome of coercing one cell.
enum Coerced {
  Value(f64),
  Missing,
  NotNumeric(String),
}

impl CellValue {
  fn coerce(&self) -> Coerced {
    match self {
      Self::Number(v) if v.is_finite() => Coerced::Value(*v),
      Self::Number(v) => Coerced::NotNumeric(v.to_string()),
      Self::Empty => Coerced::Missing,
      Self::Text(s) => {
        let trimmed = s.trim();
        if trimmed.is_empty() {
          return Coerced::Missing;
        }
        match trimmed.parse::<f64>() {
          Ok(v) if v.is_finite() => Coerced::Value(v),
          _ => Coerced::NotNumeric(s.clone()),
        }
      }
    }
  }
}

/// A rectangular table: rows are respondents, columns are item identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseBatch {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<CellValue>>,
}

impl ResponseBatch {
  pub fn new<I, S>(columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      columns: columns.into_iter().map(Into::into).collect(),
      rows:    Vec::new(),
    }
  }

  /// Append a respondent row; builder-style for fixtures and adapters.
  pub fn with_row<I, V>(mut self, cells: I) -> Self
  where
    I: IntoIterator<Item = V>,
    V: Into<CellValue>,
  {
    self.rows.push(cells.into_iter().map(Into::into).collect());
    self
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// A batch narrowed to exactly the required items, stored column-major.
///
/// Every column has one finite value per respondent, in upload order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
  items:   Vec<ItemId>,
  columns: Vec<Vec<f64>>,
  rows:    usize,
}

impl ValidatedBatch {
  pub fn items(&self) -> &[ItemId] { &self.items }

  pub fn respondents(&self) -> usize { self.rows }

  pub fn column(&self, item: &str) -> Option<&[f64]> {
    let idx = self.items.iter().position(|i| i == item)?;
    Some(&self.columns[idx])
  }

  /// The scores of one respondent, paired with their item identifiers.
  pub fn row(&self, index: usize) -> Vec<(&str, f64)> {
    self
      .items
      .iter()
      .zip(&self.columns)
      .map(|(item, col)| (item.as_str(), col[index]))
      .collect()
  }

  /// Borrow the sub-matrix for `items`, failing on the first item that is
  /// not part of this batch.
  pub fn matrix(
    &self,
    items: &[ItemId],
  ) -> Result<ItemMatrix<'_>, ValidationError> {
    let columns = items
      .iter()
      .map(|item| {
        self
          .column(item)
          .ok_or_else(|| ValidationError::MissingColumn { item: item.clone() })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(ItemMatrix::with_rows(columns, self.rows))
  }
}

// ─── Validator ───────────────────────────────────────────────────────────────

/// Check `batch` against `required` and coerce it into a [`ValidatedBatch`].
///
/// Row numbers in errors are 1-based respondent numbers. Column checks run
/// before the empty-batch check; cells are checked in row order and the first
/// offending cell is reported.
pub fn validate(
  batch: &ResponseBatch,
  required: &[ItemId],
) -> Result<ValidatedBatch, ValidationError> {
  let mut items: Vec<ItemId> = Vec::with_capacity(required.len());
  let mut positions: Vec<usize> = Vec::with_capacity(required.len());

  for item in required {
    if items.contains(item) {
      continue;
    }
    let mut hits = batch
      .columns
      .iter()
      .enumerate()
      .filter(|(_, c)| *c == item)
      .map(|(i, _)| i);
    let pos = hits
      .next()
      .ok_or_else(|| ValidationError::MissingColumn { item: item.clone() })?;
    if hits.next().is_some() {
      return Err(ValidationError::DuplicateColumn { item: item.clone() });
    }
    items.push(item.clone());
    positions.push(pos);
  }

  if batch.rows.is_empty() {
    return Err(ValidationError::EmptyBatch);
  }

  let mut columns: Vec<Vec<f64>> =
    vec![Vec::with_capacity(batch.rows.len()); items.len()];

  for (idx, row) in batch.rows.iter().enumerate() {
    let number = idx + 1;
    if row.len() != batch.columns.len() {
      return Err(ValidationError::RaggedRow {
        row:      number,
        expected: batch.columns.len(),
        found:    row.len(),
      });
    }
    for ((column, &pos), item) in columns.iter_mut().zip(&positions).zip(&items)
    {
      match row[pos].coerce() {
        Coerced::Value(v) => column.push(v),
        Coerced::Missing => {
          return Err(ValidationError::MissingValue {
            item: item.clone(),
            row:  number,
          });
        }
        Coerced::NotNumeric(value) => {
          return Err(ValidationError::NonNumericValue {
            item: item.clone(),
            row: number,
            value,
          });
        }
      }
    }
  }

  Ok(ValidatedBatch { items, columns, rows: batch.rows.len() })
}
