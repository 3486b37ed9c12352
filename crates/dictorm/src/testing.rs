//! Scripted connection used by unit tests.

use crate::dialect::Backend;
use crate::driver::{Connection, Cursor};
use crate::error::{OrmError, OrmResult};
use crate::value::{Row, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct MockState {
    /// Every attempted statement, including failed ones.
    pub executed: Vec<(String, Vec<Value>)>,
    pub cursors_opened: usize,
    pub pings: usize,
    pub begins: usize,
    pub commits: usize,
    /// Cursors with an id below this fail every statement.
    pub stale_cursors: usize,
    /// Fail this many upcoming statements regardless of cursor.
    pub failures: usize,
    pub ping_fails: bool,
    pub delay: Option<Duration>,
    pub rows: Vec<Row>,
    pub affected: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct MockConnection {
    state: Arc<Mutex<MockState>>,
    backend: Option<Backend>,
}

impl MockConnection {
    pub fn new(backend: Backend) -> Self {
        Self {
            state: Arc::default(),
            backend: Some(backend),
        }
    }

    /// A connection that relies on type-name detection (and fails it).
    pub fn untagged() -> Self {
        Self {
            state: Arc::default(),
            backend: None,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state().executed.iter().map(|(sql, _)| sql.clone()).collect()
    }
}

impl Connection for MockConnection {
    type Cursor = MockCursor;

    fn backend(&self) -> OrmResult<Backend> {
        match self.backend {
            Some(backend) => Ok(backend),
            None => Backend::detect(std::any::type_name::<Self>()),
        }
    }

    async fn cursor(&self) -> OrmResult<MockCursor> {
        let mut state = self.state();
        let id = state.cursors_opened;
        state.cursors_opened += 1;
        Ok(MockCursor {
            id,
            state: Arc::clone(&self.state),
        })
    }

    async fn ping(&self) -> OrmResult<()> {
        let mut state = self.state();
        state.pings += 1;
        if state.ping_fails {
            return Err(OrmError::driver("server has gone away"));
        }
        Ok(())
    }

    async fn begin(&self) -> OrmResult<()> {
        self.state().begins += 1;
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        self.state().commits += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct MockCursor {
    id: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockCursor {
    fn record(&self, sql: &str, params: &[Value]) -> OrmResult<(Option<Duration>, Vec<Row>, u64)> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.executed.push((sql.to_string(), params.to_vec()));
        if self.id < state.stale_cursors {
            return Err(OrmError::driver("cursor is stale"));
        }
        if state.failures > 0 {
            state.failures -= 1;
            return Err(OrmError::driver("scripted failure"));
        }
        Ok((state.delay, state.rows.clone(), state.affected))
    }
}

impl Cursor for MockCursor {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let (delay, _, affected) = self.record(sql, params)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(affected)
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let (delay, rows, _) = self.record(sql, params)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }
}
