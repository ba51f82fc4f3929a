//! API error type and [`axum::response::IntoResponse`] implementation.

use alpha_core::{ValidationError, analysis::AnalysisError};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The uploaded batch was rejected before anything was stored.
  #[error("invalid batch: {0}")]
  Invalid(#[from] ValidationError),

  /// A store failed; the run, if any, was not recorded.
  #[error("store error: {0}")]
  Store(#[source] AnalysisError),
}

impl From<AnalysisError> for ApiError {
  fn from(e: AnalysisError) -> Self {
    match e {
      AnalysisError::Validation(v) => Self::Invalid(v),
      other => Self::Store(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
