//! JSON REST API for the reliability analysis engine.
//!
//! Exposes an axum [`Router`] backed by an [`Analyzer`] over any pair of store
//! implementations. Rendering, charts and spreadsheet parsing are the
//! caller's responsibility; this layer speaks plain JSON records.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", alpha_api::api_router(state.clone()))
//! ```

pub mod analyses;
pub mod error;

use std::sync::Arc;

use alpha_core::{
  analysis::Analyzer,
  schema::DimensionSchema,
  store::{AnalysisResultStore, RawResponseStore},
};
use axum::{Router, routing::get};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<R, A> {
  pub analyzer: Analyzer<R, A>,
  /// The dimension schema every uploaded batch is analysed against.
  pub schema:   DimensionSchema,
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<R, A>(state: Arc<ApiState<R, A>>) -> Router<()>
where
  R: RawResponseStore + 'static,
  A: AnalysisResultStore + 'static,
{
  Router::new()
    .route(
      "/analyses",
      get(analyses::list::<R, A>).post(analyses::create::<R, A>),
    )
    .route("/analyses/{run_id}", get(analyses::get_one::<R, A>))
    .route("/schema", get(analyses::schema::<R, A>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use alpha_core::{
    memory::{MemoryRawStore, MemoryResultStore},
    schema::Dimension,
  };
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  type State = Arc<ApiState<MemoryRawStore, MemoryResultStore>>;

  fn state() -> State {
    Arc::new(ApiState {
      analyzer: Analyzer::new(MemoryRawStore::new(), MemoryResultStore::new()),
      schema:   DimensionSchema::partitioned([
        Dimension::new("content", ["Q1", "Q2"]),
        Dimension::new("accuracy", ["Q3", "Q4"]),
      ])
      .unwrap(),
    })
  }

  async fn send(state: &State, req: Request<Body>) -> (StatusCode, Value) {
    let resp = api_router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn post(body: Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri("/analyses")
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
  }

  fn mixed_batch() -> Value {
    json!({
      "columns": ["Q1", "Q2", "Q3", "Q4"],
      "rows": [[4, 5, 3, 3], [2, "2", 3, 3], [5, 4, 3, 3], [3, 3, 3, 3]],
    })
  }

  #[tokio::test]
  async fn post_returns_run_with_per_dimension_markers() {
    let s = state();
    let (status, body) = send(&s, post(mixed_batch())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["respondents"], 4);
    assert_eq!(body["results"][0]["dimension"], "content");
    assert_eq!(body["results"][0]["outcome"]["status"], "computed");
    assert_eq!(body["results"][1]["outcome"]["status"], "undefined");
    assert_eq!(
      body["results"][1]["outcome"]["reason"]["kind"],
      "zero_variance"
    );
    assert!(body["reliability"].get("content").is_some());
    assert!(body["reliability"].get("accuracy").is_none());
  }

  #[tokio::test]
  async fn invalid_batch_is_unprocessable_and_not_stored() {
    let s = state();
    let (status, body) =
      send(&s, post(json!({ "columns": ["Q1", "Q2", "Q3"], "rows": [[1, 2, 3]] })))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Q4"));
    assert_eq!(s.analyzer.raw_store().count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn store_failure_is_reported_as_incomplete_run() {
    let s = state();
    s.analyzer.raw_store().set_unavailable(true);
    let (status, _) = send(&s, post(mixed_batch())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn history_and_lookup() {
    let s = state();
    let (_, first) = send(&s, post(mixed_batch())).await;
    let (_, second) = send(&s, post(mixed_batch())).await;

    let (status, rows) = send(&s, get("/analyses")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["run_id"], second["run_id"]);
    assert_eq!(rows[3]["run_id"], first["run_id"]);

    let (_, page) = send(&s, get("/analyses?limit=1&before=3")).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["seq"], 2);

    let id = first["run_id"].as_str().unwrap();
    let (status, run) = send(&s, get(&format!("/analyses/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["run_id"], first["run_id"]);
  }

  #[tokio::test]
  async fn unknown_run_is_not_found() {
    let s = state();
    let id = uuid::Uuid::new_v4();
    let (status, body) = send(&s, get(&format!("/analyses/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
  }

  #[tokio::test]
  async fn schema_is_exposed() {
    let s = state();
    let (status, body) = send(&s, get("/schema")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dimensions"][1]["name"], "accuracy");
    assert_eq!(body["dimensions"][1]["items"], json!(["Q3", "Q4"]));
  }
}
