use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

use salesintel_core::traits::QueryExecutor;
use salesintel_core::Error;
use salesintel_query::{QueryValidator, SqliteExecutor, Verdict};

fn seed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sales.db");
    let conn = Connection::open(&path).expect("create db");
    conn.execute_batch(
        "CREATE TABLE leads (id INTEGER PRIMARY KEY, company_name TEXT, ai_score REAL, notes TEXT);
         INSERT INTO leads VALUES (1, 'Acme', 81.5, 'Interested in premium tier');
         INSERT INTO leads VALUES (2, 'Globex', NULL, NULL);
         INSERT INTO leads VALUES (3, 'Initech', 40.0, 'Cold');",
    )
    .expect("seed");
    path
}

#[tokio::test]
async fn returns_named_columns_in_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let exec = SqliteExecutor::open(seed(&dir))?;
    let rows = exec.fetch_rows("SELECT l.id, l.company_name, l.ai_score FROM leads l ORDER BY l.id", 100).await?;
    assert_eq!(rows.len(), 3);
    let keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(keys, vec!["id", "company_name", "ai_score"]);
    assert_eq!(rows[0]["company_name"], Value::from("Acme"));
    assert_eq!(rows[1]["ai_score"], Value::Null);

    let count = exec.fetch_rows("SELECT COUNT(*) AS total FROM leads l", 100).await?;
    assert_eq!(count[0]["total"], Value::from(3));
    Ok(())
}

#[tokio::test]
async fn writes_are_refused_by_the_connection() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = seed(&dir);
    let exec = SqliteExecutor::open(&path)?;
    let err = exec.fetch_rows("DELETE FROM leads", 100).await.expect_err("read-only");
    assert!(matches!(err, Error::Execution(_)));
    assert_eq!(err.to_string(), "query execution failed");

    let rows = exec.fetch_rows("SELECT id FROM leads", 100).await?;
    assert_eq!(rows.len(), 3);
    Ok(())
}

#[tokio::test]
async fn bad_query_is_an_execution_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let exec = SqliteExecutor::open(seed(&dir))?;
    let err = exec.fetch_rows("SELECT nope FROM leads", 100).await.expect_err("unknown column");
    assert!(matches!(err, Error::Execution(_)));
    Ok(())
}

#[test]
fn missing_database_is_not_created() {
    let dir = TempDir::new().expect("tmp");
    let path = dir.path().join("absent.db");
    assert!(SqliteExecutor::open(&path).is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn row_cap_stops_reading_early() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("big.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE leads (id INTEGER PRIMARY KEY);
         WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 500)
         INSERT INTO leads (id) SELECT i FROM n;",
    )?;
    drop(conn);

    let exec = SqliteExecutor::open(&path)?;
    let rows = exec.fetch_rows("SELECT a.id, b.id AS other FROM leads a CROSS JOIN leads b", 101).await?;
    assert_eq!(rows.len(), 101);
    assert!(exec.fetch_rows("SELECT id FROM leads", 0).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn parenthesised_table_outside_allow_list_never_runs() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = seed(&dir);
    let conn = Connection::open(&path)?;
    conn.execute_batch("CREATE TABLE api_keys (id INTEGER PRIMARY KEY, secret TEXT); INSERT INTO api_keys VALUES (1, 'sk-live-123');")?;
    drop(conn);

    let query = "SELECT k.secret FROM (api_keys k)";
    let exec = SqliteExecutor::open(&path)?;
    // The store itself would answer it.
    assert_eq!(exec.fetch_rows(query, 100).await?.len(), 1);
    let validator = QueryValidator::new(["leads"], 4000)?;
    assert!(matches!(validator.validate(query), Verdict::Rejected(_)));
    Ok(())
}
