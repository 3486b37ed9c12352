//! Backend dialects.
//!
//! [`Backend`] decides everything that differs between the supported databases:
//! literal quoting, placeholder style, the primary-key declaration injected by
//! table creation and the statement used to empty a table. Identifier quoting
//! lives in [`crate::ident`].

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Mysql,
    Postgres,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Sqlite, Backend::Mysql, Backend::Postgres];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
        }
    }

    /// Detect the backend from a driver type name.
    ///
    /// Case-insensitive substring match against `sqlite`, `mysql` and
    /// `postgres`, checked in that order.
    pub fn detect(type_name: &str) -> OrmResult<Self> {
        let lowered = type_name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| lowered.contains(b.name()))
            .ok_or_else(|| OrmError::UnsupportedBackend(type_name.to_string()))
    }

    /// Detect the backend from a connection URL scheme.
    pub fn from_url(url: &str) -> OrmResult<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| OrmError::UnsupportedBackend(format!("no scheme in '{url}'")))?;
        scheme.parse()
    }

    /// Render the placeholder for the `index`-th (1-based) bound parameter.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Backend::Sqlite | Backend::Mysql => "?".to_string(),
            Backend::Postgres => format!("${index}"),
        }
    }

    /// Column declaration used for an auto-generated integer primary key.
    pub fn primary_key_decl(self) -> &'static str {
        match self {
            // `integer` (exactly) makes the column an alias for the rowid.
            Backend::Sqlite => "integer not null",
            Backend::Mysql => "int not null auto_increment",
            Backend::Postgres => "bigserial not null",
        }
    }

    /// Whether `truncate table` is available.
    pub fn supports_truncate(self) -> bool {
        !matches!(self, Backend::Sqlite)
    }

    /// Render a value as an SQL literal for this backend.
    ///
    /// Values are not type-aware: every non-null value is stringified and
    /// quoted, leaving conversion to the database.
    pub fn render_literal(self, value: &Value) -> String {
        render_literal(value, self)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            "mysql" | "mariadb" => Ok(Backend::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Backend::Postgres),
            other => Err(OrmError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Render a value as an SQL literal for `backend`.
pub fn render_literal(value: &Value, backend: Backend) -> String {
    let Some(text) = value.to_text() else {
        return "NULL".to_string();
    };
    match backend {
        Backend::Sqlite | Backend::Postgres => quote_standard(&text),
        Backend::Mysql => quote_mysql(&text),
    }
}

/// Standard SQL string literal: single quotes, embedded quotes doubled.
fn quote_standard(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// MySQL string literal with `mysql_real_escape_string` escaping.
fn quote_mysql(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
