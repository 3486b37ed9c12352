//! Caller-owned session: the bound connection, its cursor and the SQL executor.
//!
//! A [`Session`] replaces process-wide connection state. It starts unbound;
//! [`Session::bind`] attaches a [`Connection`], records its [`Backend`] and
//! opens the first cursor. Every statement goes through the executor, which
//! retries a failed statement exactly once on a fresh cursor.
//!
//! # Example
//!
//! ```ignore
//! use dictorm::{Session, SessionConfig, row};
//! use dictorm::driver::sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! let mut session = Session::connect(conn, SessionConfig::new().debug(true)).await?;
//! session.execute("create table t (a int)", false).await?;
//! let rows = session.fetch_all("select * from t").await?;
//! ```

use crate::config::SessionConfig;
use crate::dialect::Backend;
use crate::driver::{Connection, Cursor};
use crate::error::{OrmError, OrmResult};
use crate::statement::Statement;
use crate::value::{Row, Value};
use tracing::Level;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

enum Outcome {
    Affected(u64),
    Rows(Vec<Row>),
}

/// A database session bound to at most one connection.
pub struct Session<C: Connection> {
    conn: Option<C>,
    cursor: Option<C::Cursor>,
    backend: Option<Backend>,
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Create an unbound session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            conn: None,
            cursor: None,
            backend: None,
            config,
        }
    }

    /// Create a session and bind `conn` to it.
    pub async fn connect(conn: C, config: SessionConfig) -> OrmResult<Self> {
        let mut session = Self::new(config);
        session.bind(conn).await?;
        Ok(session)
    }

    /// Bind a connection, detecting its backend.
    ///
    /// Fails with [`OrmError::UnsupportedBackend`] when the connection does
    /// not map to a known backend. Any previously bound connection is dropped.
    pub async fn bind(&mut self, conn: C) -> OrmResult<()> {
        let backend = conn.backend()?;
        self.bind_as(conn, backend).await
    }

    /// Bind a connection with an explicit backend.
    pub async fn bind_as(&mut self, conn: C, backend: Backend) -> OrmResult<()> {
        let cursor = conn.cursor().await?;
        tracing::debug!(target: "dictorm.session", %backend, "connection bound");
        self.conn = Some(conn);
        self.cursor = Some(cursor);
        self.backend = Some(backend);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.conn.is_some()
    }

    /// Backend of the bound connection.
    pub fn backend(&self) -> OrmResult<Backend> {
        self.backend.ok_or(OrmError::NotConnected)
    }

    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_debug(&mut self, on: bool) {
        self.config.debug = on;
    }

    pub fn set_autocommit(&mut self, on: bool) {
        self.config.autocommit = on;
    }

    /// Make sure a connection is bound and a cursor is open.
    ///
    /// With `force_new_cursor`, the connection is probed first (a failed probe
    /// is only logged) and the current cursor is replaced.
    pub async fn ensure_ready(&mut self, force_new_cursor: bool) -> OrmResult<Backend> {
        let conn = self.conn.as_ref().ok_or(OrmError::NotConnected)?;
        let backend = self.backend.ok_or(OrmError::NotConnected)?;
        if force_new_cursor {
            if let Err(e) = conn.ping().await {
                tracing::debug!(target: "dictorm.session", %backend, error = %e, "liveness probe failed");
            }
            self.cursor = None;
        }
        if self.cursor.is_none() {
            self.cursor = Some(conn.cursor().await?);
        }
        Ok(backend)
    }

    /// Commit the bound connection.
    pub async fn commit(&mut self) -> OrmResult<()> {
        let conn = self.conn.as_ref().ok_or(OrmError::NotConnected)?;
        conn.commit().await
    }

    /// Execute raw SQL, returning the number of affected rows.
    ///
    /// Row-returning statements report their row count. With autocommit off,
    /// the connection opens a transaction first if none is open.
    pub async fn execute(&mut self, sql: &str, commit: bool) -> OrmResult<u64> {
        let stmt = Statement::new(self.backend()?, sql);
        self.execute_statement(&stmt, commit).await
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute_statement(&mut self, stmt: &Statement, commit: bool) -> OrmResult<u64> {
        let affected = match self.run(stmt, false).await? {
            Outcome::Affected(n) => n,
            Outcome::Rows(rows) => rows.len() as u64,
        };
        if commit {
            self.commit().await?;
        }
        Ok(affected)
    }

    /// Run a raw query and return every row.
    pub async fn fetch_all(&mut self, sql: &str) -> OrmResult<Vec<Row>> {
        let stmt = Statement::new(self.backend()?, sql);
        self.fetch_statement(&stmt).await
    }

    /// Run a query statement and return every row.
    pub async fn fetch_statement(&mut self, stmt: &Statement) -> OrmResult<Vec<Row>> {
        match self.run(stmt, true).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Affected(_) => Ok(Vec::new()),
        }
    }

    async fn run(&mut self, stmt: &Statement, fetch: bool) -> OrmResult<Outcome> {
        let backend = self.ensure_ready(false).await?;
        self.log_statement(backend, stmt);
        let sql = stmt.to_sql();

        let first_try = self.attempt(&sql, stmt.params(), fetch).await;
        match first_try {
            Ok(outcome) => Ok(outcome),
            Err(first) => {
                tracing::warn!(
                    target: "dictorm.session",
                    %backend,
                    error = %first,
                    "statement failed, retrying on a fresh cursor"
                );
                let retried = match self.ensure_ready(true).await {
                    Ok(_) => self.attempt(&sql, stmt.params(), fetch).await,
                    Err(e) => Err(e),
                };
                retried.map_err(|source| OrmError::QueryExecution {
                    backend,
                    sql,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn attempt(&mut self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Outcome> {
        let timeout = self.config.query_timeout;
        let begin = !fetch && !self.config.autocommit;
        let conn = self.conn.as_ref().ok_or(OrmError::NotConnected)?;
        let cursor = self.cursor.as_mut().ok_or(OrmError::NotConnected)?;
        let work = async {
            if begin {
                conn.begin().await?;
            }
            let outcome = if fetch {
                Outcome::Rows(cursor.fetch(sql, params).await?)
            } else {
                Outcome::Affected(cursor.execute(sql, params).await?)
            };
            Ok::<_, OrmError>(outcome)
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| OrmError::Timeout(limit))?,
            None => work.await,
        }
    }

    fn log_statement(&self, backend: Backend, stmt: &Statement) {
        let level = if self.config.debug {
            Level::INFO
        } else {
            Level::TRACE
        };
        if level == Level::TRACE && !tracing::enabled!(target: "dictorm.sql", Level::TRACE) {
            return;
        }

        let inline = stmt.to_inline_sql();
        let sql = match self.config.max_log_sql_length {
            Some(max) if inline.len() > max => format!("{}...", truncate_sql_bytes(&inline, max)),
            _ => inline,
        };
        let param_count = stmt.params().len();
        if level == Level::INFO {
            tracing::info!(target: "dictorm.sql", %backend, param_count, sql = %sql);
        } else {
            tracing::trace!(target: "dictorm.sql", %backend, param_count, sql = %sql);
        }
    }
}

impl<C: Connection + std::fmt::Debug> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("conn", &self.conn)
            .field("backend", &self.backend)
            .field("has_cursor", &self.cursor.is_some())
            .field("config", &self.config)
            .finish()
    }
}
