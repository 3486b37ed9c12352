//! `rusqlite` adapter.
//!
//! rusqlite is synchronous; every call runs on tokio's blocking pool against a
//! connection shared behind a mutex.

use super::{Connection, Cursor};
use crate::dialect::Backend;
use crate::error::{OrmError, OrmResult};
use crate::value::{Row, Value};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use std::path::Path;
use std::sync::{Arc, Mutex};

type Shared = Arc<Mutex<rusqlite::Connection>>;

/// A SQLite database handle.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    conn: Shared,
}

impl SqliteConnection {
    pub fn open(path: impl AsRef<Path>) -> OrmResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

async fn with_conn<T, F>(conn: &Shared, f: F) -> OrmResult<T>
where
    F: FnOnce(&rusqlite::Connection) -> OrmResult<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| OrmError::driver("sqlite connection mutex poisoned"))?;
        f(&guard)
    })
    .await
    .map_err(|e| OrmError::driver(format!("sqlite task failed: {e}")))?
}

impl Connection for SqliteConnection {
    type Cursor = SqliteCursor;

    fn backend(&self) -> OrmResult<Backend> {
        Ok(Backend::Sqlite)
    }

    async fn cursor(&self) -> OrmResult<SqliteCursor> {
        Ok(SqliteCursor {
            conn: Arc::clone(&self.conn),
        })
    }

    async fn ping(&self) -> OrmResult<()> {
        with_conn(&self.conn, |conn| {
            conn.query_row("select 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }

    async fn begin(&self) -> OrmResult<()> {
        with_conn(&self.conn, |conn| {
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN")?;
            }
            Ok(())
        })
        .await
    }

    async fn commit(&self) -> OrmResult<()> {
        with_conn(&self.conn, |conn| {
            if !conn.is_autocommit() {
                conn.execute_batch("COMMIT")?;
            }
            Ok(())
        })
        .await
    }
}

/// Cursor over a shared SQLite connection.
#[derive(Debug)]
pub struct SqliteCursor {
    conn: Shared,
}

impl Cursor for SqliteCursor {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let sql = sql.to_string();
        let params = params.to_vec();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            if stmt.column_count() == 0 {
                let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
                return Ok(affected as u64);
            }
            // Row-returning statements report how many rows they produced.
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut count = 0;
            while rows.next()?.is_some() {
                count += 1;
            }
            Ok(count)
        })
        .await
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = (0..names.len())
                    .map(|i| row.get_ref(i).map(value_from_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                out.push(Row::from_columns(&names, values));
            }
            Ok(out)
        })
        .await
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
