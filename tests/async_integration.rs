//! Integration tests for the async entry point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strata::migrate::{ApplyOutcome, MigrationEngine, MigrationError, Schema, UpdateRule, exec, sql_digest};
use strata::sqlite::{Context, SqliteConfig, SqliteConnection};

const V1: &str = "CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT NOT NULL);";
const V2: &str = "CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT NOT NULL, at INTEGER);";

#[tokio::test]
async fn test_apply_async_initializes_and_upgrades() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig::file(dir.path().join("events.db"));
    let conn = SqliteConnection::open(&config).await.unwrap();
    let engine = MigrationEngine::default();

    let report = engine
        .apply_async(Arc::new(Schema::new(V1)), &conn, Context::background())
        .await
        .unwrap();
    assert_eq!(report.outcome, ApplyOutcome::Initialized);

    let schema = Arc::new(Schema::new(V2).with_update(UpdateRule::new(
        sql_digest(V1).unwrap(),
        sql_digest(V2).unwrap(),
        exec(["ALTER TABLE events ADD COLUMN at INTEGER"]),
    )));
    let report = engine
        .apply_async(schema.clone(), &conn, Context::with_timeout(Duration::from_secs(30)))
        .await
        .unwrap();
    assert_eq!(report.outcome, ApplyOutcome::Upgraded);

    let report = engine
        .apply_async(schema, &conn, Context::background())
        .await
        .unwrap();
    assert_eq!(report.outcome, ApplyOutcome::UpToDate);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_apply_async_expired_deadline() {
    let conn = SqliteConnection::open(&SqliteConfig::memory()).await.unwrap();
    let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));

    let err = MigrationEngine::default()
        .apply_async(Arc::new(Schema::new(V1)), &conn, ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::DeadlineExceeded));

    let tables: i64 = conn
        .call(|c| c.query_row("SELECT count(*) FROM sqlite_schema", [], |row| row.get(0)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tables, 0);
}
