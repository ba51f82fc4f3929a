//! Cronbach's alpha over a numeric item matrix.
//!
//! All variances are sample variances (divisor `n - 1`). The coefficient is
//! never clamped: negative values and values above 1 are returned as computed.

use serde::{Deserialize, Serialize};

use crate::ComputationError;

// ─── Matrix ──────────────────────────────────────────────────────────────────

/// A borrowed, column-major `respondents × items` matrix.
#[derive(Debug, Clone)]
pub struct ItemMatrix<'a> {
  columns: Vec<&'a [f64]>,
  rows:    usize,
}

impl<'a> ItemMatrix<'a> {
  /// Build a matrix from item columns; every column must have the same
  /// length.
  pub fn new(columns: Vec<&'a [f64]>) -> Result<Self, ComputationError> {
    let rows = columns.first().map_or(0, |c| c.len());
    if columns.iter().any(|c| c.len() != rows) {
      return Err(ComputationError::RaggedColumns);
    }
    Ok(Self { columns, rows })
  }

  /// Columns are known to hold `rows` values each.
  pub(crate) fn with_rows(columns: Vec<&'a [f64]>, rows: usize) -> Self {
    debug_assert!(columns.iter().all(|c| c.len() == rows));
    Self { columns, rows }
  }

  pub fn items(&self) -> usize { self.columns.len() }

  pub fn respondents(&self) -> usize { self.rows }

  /// Each respondent's total score across all items.
  fn totals(&self) -> Vec<f64> {
    (0..self.rows)
      .map(|r| self.columns.iter().map(|c| c[r]).sum())
      .collect()
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Sample variance with divisor `n - 1`. Callers guarantee `n >= 2`.
///
/// A sequence of identical values has variance exactly zero, even where the
/// floating-point mean would drift by an ulp.
fn sample_variance(values: &[f64]) -> f64 {
  if values.iter().all(|v| *v == values[0]) {
    return 0.0;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Cronbach's alpha: `k / (k - 1) * (1 - Σ item variances / total variance)`.
pub fn cronbach_alpha(matrix: &ItemMatrix<'_>) -> Result<f64, ComputationError> {
  let k = matrix.items();
  if k < 2 {
    return Err(ComputationError::InsufficientItems { found: k });
  }
  let n = matrix.respondents();
  if n < 2 {
    return Err(ComputationError::InsufficientSample { found: n });
  }

  let item_var_sum: f64 =
    matrix.columns.iter().map(|c| sample_variance(c)).sum();
  let total_var = sample_variance(&matrix.totals());
  if total_var == 0.0 {
    return Err(ComputationError::ZeroVariance);
  }
  if !item_var_sum.is_finite() || !total_var.is_finite() {
    return Err(ComputationError::NonFinite);
  }

  let k = k as f64;
  let alpha = (k / (k - 1.0)) * (1.0 - item_var_sum / total_var);
  if !alpha.is_finite() {
    return Err(ComputationError::NonFinite);
  }
  Ok(alpha)
}

/// Mean over respondents of each respondent's average item score.
///
/// `None` for a matrix with no items or no respondents, or when the scores
/// are too large to sum.
pub fn mean_score(matrix: &ItemMatrix<'_>) -> Option<f64> {
  let k = matrix.items();
  let n = matrix.respondents();
  if k == 0 || n == 0 {
    return None;
  }
  let row_means = matrix.totals().into_iter().map(|t| t / k as f64);
  let mean = row_means.sum::<f64>() / n as f64;
  mean.is_finite().then_some(mean)
}

// ─── Interpretation ──────────────────────────────────────────────────────────

/// Conventional rule-of-thumb reading of an alpha value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
  Excellent,
  Good,
  Acceptable,
  Questionable,
  Poor,
  Unacceptable,
}

impl Reliability {
  pub fn from_alpha(alpha: f64) -> Self {
    match alpha {
      a if a >= 0.9 => Self::Excellent,
      a if a >= 0.8 => Self::Good,
      a if a >= 0.7 => Self::Acceptable,
      a if a >= 0.6 => Self::Questionable,
      a if a >= 0.5 => Self::Poor,
      _ => Self::Unacceptable,
    }
  }
}
