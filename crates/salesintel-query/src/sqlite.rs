use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use salesintel_core::traits::QueryExecutor;
use salesintel_core::types::Row;
use salesintel_core::{Error, Result};

fn execution(e: impl std::fmt::Display) -> Error {
    Error::Execution(e.to_string())
}

/// Structured-store read path over a SQLite file.
///
/// The connection is opened read-only and additionally pinned with
/// `PRAGMA query_only`, so a query that slipped past validation still
/// cannot write.
pub struct SqliteExecutor {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags)
            .map_err(|e| Error::Storage(format!("open {}: {e}", path.display())))?;
        conn.execute_batch("PRAGMA query_only = ON;").map_err(|e| Error::Storage(e.to_string()))?;
        tracing::info!(target: "query", path = %path.display(), "opened read-only structured store");
        Ok(Self { path, conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

fn run(conn: &Connection, query: &str, max_rows: usize) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(query).map_err(execution)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query([]).map_err(execution)?;
    let mut out = Vec::new();
    while out.len() < max_rows {
        let Some(row) = rows.next().map_err(execution)? else { break };
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(i).map_err(execution)?));
        }
        out.push(record);
    }
    Ok(out)
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn fetch_rows(&self, query: &str, max_rows: usize) -> Result<Vec<Row>> {
        let conn = Arc::clone(&self.conn);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| Error::Execution("connection lock poisoned".into()))?;
            run(&guard, &query, max_rows)
        })
        .await
        .map_err(execution)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_sqlite_values_to_json() {
        assert_eq!(to_json(ValueRef::Null), Value::Null);
        assert_eq!(to_json(ValueRef::Integer(7)), Value::from(7));
        assert_eq!(to_json(ValueRef::Real(1.5)), Value::from(1.5));
        assert_eq!(to_json(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(to_json(ValueRef::Text(b"acme")), Value::from("acme"));
        assert_eq!(to_json(ValueRef::Blob(&[1, 2, 3])), Value::from("<3 bytes>"));
    }
}
