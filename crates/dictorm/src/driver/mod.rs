//! Driver seam.
//!
//! A [`Connection`] is an open database handle; a [`Cursor`] is the thing
//! statements run on. A [`crate::Session`] keeps one cursor and replaces it
//! when execution fails, so adapters should make cursor creation cheap and
//! make a fresh cursor recover from whatever broke the previous one.
//!
//! Adapters are shipped for `tokio-postgres` ([`postgres::PgConnection`]) and,
//! with the `sqlite` feature, `rusqlite` ([`sqlite::SqliteConnection`]).

use crate::dialect::Backend;
use crate::error::OrmResult;
use crate::value::{Row, Value};

pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// An open database connection.
pub trait Connection: Send + Sync {
    type Cursor: Cursor;

    /// The SQL dialect spoken by this connection.
    ///
    /// The default implementation sniffs the implementing type's name for
    /// `sqlite`, `mysql` or `postgres`. Adapters should override it with an
    /// explicit tag.
    fn backend(&self) -> OrmResult<Backend> {
        Backend::detect(std::any::type_name::<Self>())
    }

    /// Open a new cursor.
    fn cursor(&self) -> impl std::future::Future<Output = OrmResult<Self::Cursor>> + Send;

    /// Cheap liveness probe.
    ///
    /// The default implementation always succeeds.
    fn ping(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Ok(()) }
    }

    /// Open a transaction unless one is already open.
    ///
    /// Called before every mutating statement when the session is not in
    /// autocommit mode, so statements accumulate until [`Connection::commit`].
    /// The default implementation does nothing, for drivers that are
    /// transactional on their own.
    fn begin(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Ok(()) }
    }

    /// Commit the current transaction, if any.
    fn commit(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;
}

/// Executes statements for a [`Connection`].
///
/// SQL uses the placeholder style of the connection's backend and `params`
/// are in placeholder order.
pub trait Cursor: Send {
    /// Run a statement and return the number of affected rows.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Run a query and return all rows, columns in result order.
    fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;
}
