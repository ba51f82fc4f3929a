//! Integration tests for the SQLite stores against in-memory and temporary
//! file databases.

use std::path::PathBuf;

use alpha_core::{
  ComputationError,
  analysis::Analyzer,
  batch::{CellValue, ResponseBatch, validate},
  run::{AnalysisRun, DimensionOutcome, DimensionResult},
  schema::{Dimension, DimensionSchema},
  store::{AnalysisResultStore, History, RawResponseStore},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{Error, SqliteRawStore, SqliteResultStore};

async fn raw_store() -> SqliteRawStore {
  SqliteRawStore::open_in_memory()
    .await
    .expect("in-memory raw store")
}

async fn result_store() -> SqliteResultStore {
  SqliteResultStore::open_in_memory()
    .await
    .expect("in-memory result store")
}

fn temp_db() -> PathBuf {
  std::env::temp_dir().join(format!("alpha-store-{}.sqlite", Uuid::new_v4()))
}

fn batch() -> ResponseBatch {
  ResponseBatch::new(["Q1", "Q2", "Q3"])
    .with_row([4, 5, 3])
    .with_row([2, 2, 3])
    .with_row([5, 4, 3])
}

fn items(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| s.to_string()).collect()
}

fn run_with(results: Vec<DimensionResult>) -> AnalysisRun {
  AnalysisRun {
    run_id: Uuid::new_v4(),
    computed_at: Utc::now(),
    respondents: 3,
    results,
  }
}

fn computed(name: &str, alpha: f64) -> DimensionResult {
  DimensionResult {
    dimension:  name.into(),
    item_count: 2,
    outcome:    DimensionOutcome::Computed { alpha },
    mean_score: Some(3.5),
  }
}

fn undefined(name: &str, reason: ComputationError) -> DimensionResult {
  DimensionResult {
    dimension:  name.into(),
    item_count: 2,
    outcome:    DimensionOutcome::Undefined { reason },
    mean_score: None,
  }
}

// ─── Raw responses ───────────────────────────────────────────────────────────

#[tokio::test]
async fn raw_schema_initialisation_is_idempotent() {
  let s = raw_store().await;
  s.initialize_schema().await.unwrap();
  s.initialize_schema().await.unwrap();
  assert_eq!(s.count().await.unwrap(), 0);
}

#[tokio::test]
async fn append_and_read_back_batch() {
  let s = raw_store().await;
  let validated = validate(&batch(), &items(&["Q3", "Q1"])).unwrap();
  let batch_id = Uuid::new_v4();

  let written = s.append(batch_id, &validated).await.unwrap();
  assert_eq!(written, 3);
  assert_eq!(s.count().await.unwrap(), 3);

  let rows = s.batch(batch_id).await.unwrap();
  assert_eq!(rows.len(), 3);
  assert!(rows.iter().all(|r| r.batch_id == batch_id));
  assert_eq!(
    rows.iter().map(|r| r.row_index).collect::<Vec<_>>(),
    [0, 1, 2]
  );
  assert_eq!(rows[2].scores, [("Q3".to_string(), 3.0), ("Q1".to_string(), 5.0)]);
}

#[tokio::test]
async fn appends_never_touch_earlier_rows() {
  let s = raw_store().await;
  let validated = validate(&batch(), &items(&["Q1", "Q2"])).unwrap();
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();

  s.append(first, &validated).await.unwrap();
  let before = s.batch(first).await.unwrap();
  s.append(second, &validated).await.unwrap();

  assert_eq!(s.count().await.unwrap(), 6);
  assert_eq!(s.batch(first).await.unwrap(), before);
}

#[tokio::test]
async fn concurrent_appends_do_not_interleave() {
  let s = raw_store().await;
  let validated = validate(&batch(), &items(&["Q1", "Q2", "Q3"])).unwrap();
  let ids: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

  let mut tasks = Vec::new();
  for id in &ids {
    let store = s.clone();
    let validated = validated.clone();
    let id = *id;
    tasks.push(tokio::spawn(async move {
      store.append(id, &validated).await.unwrap()
    }));
  }
  for t in tasks {
    assert_eq!(t.await.unwrap(), 3);
  }

  assert_eq!(s.count().await.unwrap(), 24);
  for id in ids {
    let rows = s.batch(id).await.unwrap();
    assert_eq!(rows.len(), 3);
    // Each batch's rows were written in one transaction, so contiguously.
    assert_eq!(rows[2].seq - rows[0].seq, 2);
  }
}

#[tokio::test]
async fn unknown_batch_is_empty() {
  let s = raw_store().await;
  assert!(s.batch(Uuid::new_v4()).await.unwrap().is_empty());
}

// ─── Analysis results ────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_reassemble_run() {
  let s = result_store().await;
  let run = run_with(vec![
    computed("content", 0.81),
    undefined("accuracy", ComputationError::ZeroVariance),
    undefined("solo", ComputationError::InsufficientItems { found: 1 }),
  ]);

  assert_eq!(s.record(&run).await.unwrap(), 3);

  let back = s.run(run.run_id).await.unwrap().unwrap();
  assert_eq!(back.run_id, run.run_id);
  assert_eq!(back.respondents, 3);
  assert_eq!(back.results, run.results);
  assert_eq!(back.computed_at.timestamp_micros(), run.computed_at.timestamp_micros());
}

#[tokio::test]
async fn unknown_run_is_none() {
  let s = result_store().await;
  assert!(s.run(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_most_recent_first() {
  let s = result_store().await;
  let older = run_with(vec![computed("overall", 0.7)]);
  let newer = run_with(vec![computed("overall", 0.9)]);
  s.record(&older).await.unwrap();
  s.record(&newer).await.unwrap();

  let rows = History::new(&s, 10).collect_all().await.unwrap();
  let ids: Vec<Uuid> = rows.iter().map(|r| r.run_id).collect();
  assert_eq!(ids, [newer.run_id, older.run_id]);
}

#[tokio::test]
async fn history_pages_by_sequence() {
  let s = result_store().await;
  for i in 0..5 {
    s.record(&run_with(vec![computed("a", 0.1 * i as f64), computed("b", 0.5)]))
      .await
      .unwrap();
  }

  let first = s.history_page(None, 4).await.unwrap();
  assert_eq!(first.len(), 4);
  assert!(first.windows(2).all(|w| w[0].seq > w[1].seq));

  let rest = s.history_page(Some(first[3].seq), 100).await.unwrap();
  assert_eq!(rest.len(), 6);
  assert!(rest.iter().all(|r| r.seq < first[3].seq));
}

#[tokio::test]
async fn earlier_history_is_a_suffix_of_later_history() {
  let s = result_store().await;
  s.record(&run_with(vec![computed("a", 0.6)])).await.unwrap();
  let early = History::new(&s, 3).collect_all().await.unwrap();

  s.record(&run_with(vec![computed("a", 0.7), computed("b", 0.8)]))
    .await
    .unwrap();
  let late = History::new(&s, 3).collect_all().await.unwrap();

  assert_eq!(late.len(), early.len() + 2);
  assert_eq!(late[late.len() - early.len()..], early[..]);
}

#[tokio::test]
async fn rows_recorded_mid_walk_are_not_seen() {
  let s = result_store().await;
  for _ in 0..3 {
    s.record(&run_with(vec![computed("a", 0.6)])).await.unwrap();
  }

  let mut history = History::new(&s, 2);
  let first = history.next_page().await.unwrap().unwrap();
  s.record(&run_with(vec![computed("a", 0.9)])).await.unwrap();
  let second = history.next_page().await.unwrap().unwrap();

  assert_eq!(first.len() + second.len(), 3);
  assert!(history.next_page().await.unwrap().is_none());

  history.rewind();
  assert_eq!(history.next_page().await.unwrap().unwrap()[0].seq, 4);
}

// ─── Durability ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reopening_a_file_keeps_rows() {
  let path = temp_db();

  let s = SqliteResultStore::open(&path).await.unwrap();
  let run = run_with(vec![computed("overall", 0.88)]);
  s.record(&run).await.unwrap();
  s.close().await.unwrap();

  let s = SqliteResultStore::open(&path).await.unwrap();
  let back = s.run(run.run_id).await.unwrap().unwrap();
  assert_eq!(back.results, run.results);
  s.close().await.unwrap();

  std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn both_stores_share_one_file() {
  let path = temp_db();
  let raw = SqliteRawStore::open(&path).await.unwrap();
  let results = SqliteResultStore::open(&path).await.unwrap();

  let analyzer = Analyzer::new(raw, results);
  analyzer.initialize().await.unwrap();
  let run = analyzer
    .run_analysis(&batch(), &DimensionSchema::whole(["Q1", "Q2"]))
    .await
    .unwrap();

  assert_eq!(analyzer.raw_store().count().await.unwrap(), 3);
  assert!(analyzer.run(run.run_id).await.unwrap().is_some());

  let (raw, results) = analyzer.into_stores();
  raw.close().await.unwrap();
  results.close().await.unwrap();
  std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn stored_rows_cannot_be_updated_or_deleted() {
  let path = temp_db();
  let s = SqliteRawStore::open(&path).await.unwrap();
  let validated = validate(&batch(), &items(&["Q1"])).unwrap();
  s.append(Uuid::new_v4(), &validated).await.unwrap();
  let r = SqliteResultStore::open(&path).await.unwrap();
  r.record(&run_with(vec![computed("a", 0.5)])).await.unwrap();

  let conn = rusqlite::Connection::open(&path).unwrap();
  assert!(conn.execute("UPDATE raw_responses SET scores_json = '[]'", []).is_err());
  assert!(conn.execute("DELETE FROM raw_responses", []).is_err());
  assert!(conn.execute("UPDATE analysis_results SET alpha = 1.0", []).is_err());
  assert!(conn.execute("DELETE FROM analysis_results", []).is_err());
  drop(conn);

  assert_eq!(s.count().await.unwrap(), 3);
  s.close().await.unwrap();
  r.close().await.unwrap();
  std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn newer_schema_version_is_refused() {
  let path = temp_db();
  SqliteRawStore::open(&path).await.unwrap().close().await.unwrap();

  let conn = rusqlite::Connection::open(&path).unwrap();
  conn
    .execute(
      "UPDATE schema_versions SET version = 99 WHERE component = 'raw_responses'",
      [],
    )
    .unwrap();
  drop(conn);

  let err = SqliteRawStore::open(&path).await.err().unwrap();
  assert!(matches!(
    err,
    Error::UnsupportedSchema { component: "raw_responses", found: 99, supported: 1 }
  ));
  std::fs::remove_file(&path).ok();
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyzer_records_partial_results_durably() {
  let analyzer = Analyzer::new(raw_store().await, result_store().await);
  let schema = DimensionSchema::partitioned([
    Dimension::new("varied", ["Q1", "Q2"]),
    Dimension::new("flat", ["Q3"]),
  ])
  .unwrap();

  let run = analyzer.run_analysis(&batch(), &schema).await.unwrap();
  assert!(run.result("varied").unwrap().outcome.alpha().is_some());
  assert_eq!(
    run.result("flat").unwrap().outcome,
    DimensionOutcome::Undefined {
      reason: ComputationError::InsufficientItems { found: 1 },
    }
  );

  let history = analyzer.history(10).collect_all().await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].dimension, "flat");
  assert_eq!(history[1].dimension, "varied");
  assert_eq!(analyzer.raw_store().batch(run.run_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn overflowing_dimension_is_recorded_as_undefined() {
  let analyzer = Analyzer::new(raw_store().await, result_store().await);
  let batch = ResponseBatch::new(["Q1", "Q2", "Q3", "Q4"])
    .with_row([CellValue::from(4), 5.into(), 1e200.into(), 3e200.into()])
    .with_row([CellValue::from(2), 2.into(), (-1e200).into(), 1e200.into()])
    .with_row([CellValue::from(5), 4.into(), 2e200.into(), (-3e200).into()]);
  let schema = DimensionSchema::partitioned([
    Dimension::new("ok", ["Q1", "Q2"]),
    Dimension::new("huge", ["Q3", "Q4"]),
  ])
  .unwrap();

  let run = analyzer.run_analysis(&batch, &schema).await.unwrap();
  let back = analyzer.run(run.run_id).await.unwrap().unwrap();
  assert!(back.result("ok").unwrap().outcome.alpha().is_some());
  assert_eq!(
    back.result("huge").unwrap().outcome,
    DimensionOutcome::Undefined { reason: ComputationError::NonFinite }
  );
}
