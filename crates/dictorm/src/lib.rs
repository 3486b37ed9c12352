//! # dictorm
//!
//! A small ORM helper that treats rows as ordered column → value maps.
//!
//! ## Features
//!
//! - **One API, three dialects**: SQLite, MySQL and PostgreSQL differ only in
//!   identifier quoting, placeholders and a few DDL details ([`Backend`])
//! - **Parameterized by default**: values are bound, never spliced; inline
//!   literals are rendered only for logs
//! - **Caller-owned sessions**: a [`Session`] holds the connection and cursor,
//!   and retries a failed statement once on a fresh cursor
//! - **Pluggable drivers**: implement [`Connection`] / [`Cursor`] for any
//!   client; `tokio-postgres` and (feature `sqlite`) `rusqlite` ship built in
//!
//! ## Example
//!
//! ```ignore
//! use dictorm::{Select, Session, SessionConfig, row};
//! use dictorm::driver::sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! let mut session = Session::connect(conn, SessionConfig::from_env()?).await?;
//!
//! session
//!     .create_table_from_template("t_students", &row! { "name" => "", "age" => 1 }, "id", true)
//!     .await?;
//! session.add_object("t_students", &row! { "name" => "Tom", "age" => 22 }).await?;
//!
//! let tom = session.get_object_by_id("t_students", 1).await?;
//! let adults = session
//!     .get_objects("t_students", &Select::new().filter("age >= 18").order_by("name"))
//!     .await?;
//! ```

pub mod condition;
pub mod config;
pub mod crud;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod ident;
pub mod schema;
pub mod session;
pub mod statement;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use condition::{Combinator, Conditions, build_where};
pub use config::SessionConfig;
pub use crud::{Columns, Select};
pub use dialect::{Backend, render_literal};
pub use driver::{Connection, Cursor};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, IntoIdent, render_identifier};
pub use schema::{ColumnDef, ColumnType, TableSchema, infer_column_type};
pub use session::Session;
pub use statement::Statement;
pub use value::{FromValue, Row, Value};
