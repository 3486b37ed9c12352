//! Backend-aware SQL statement builder.
//!
//! `Statement` stores SQL pieces and bound values separately. It renders the
//! placeholder style of its backend (`?` or `$1, $2, ...`) for execution, and
//! can also render every value inline as a literal for logging.
//!
//! # Example
//!
//! ```
//! use dictorm::{Backend, Statement};
//!
//! let mut stmt = Statement::new(Backend::Postgres, "select * from ");
//! stmt.push_ident("users")?.push(" where ").push_ident("name")?.push(" = ").push_bind("Tom");
//! assert_eq!(stmt.to_sql(), "select * from users where name = $1");
//! assert_eq!(stmt.to_inline_sql(), "select * from users where name = 'Tom'");
//! # Ok::<(), dictorm::OrmError>(())
//! ```

use crate::dialect::{Backend, render_literal};
use crate::error::OrmResult;
use crate::ident::IntoIdent;
use crate::value::Value;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A SQL statement with bound parameters for a specific backend.
#[derive(Debug, Clone)]
pub struct Statement {
    backend: Backend,
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl Statement {
    /// Create a new statement with an initial SQL fragment.
    pub fn new(backend: Backend, initial_sql: impl Into<String>) -> Self {
        let mut stmt = Self::empty(backend);
        stmt.push(&initial_sql.into());
        stmt
    }

    /// Create an empty statement.
    pub fn empty(backend: Backend) -> Self {
        Self {
            backend,
            parts: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    pub fn push_bind_list<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_bind(v);
        }
        self
    }

    /// Append an identifier quoted for this statement's backend.
    pub fn push_ident(&mut self, ident: impl IntoIdent) -> OrmResult<&mut Self> {
        let ident = ident.into_ident()?;
        let mut rendered = String::new();
        ident.write_sql(self.backend, &mut rendered);
        Ok(self.push(&rendered))
    }

    /// Append a comma-separated list of quoted identifiers.
    pub fn push_ident_list<I>(&mut self, idents: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: IntoIdent,
    {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(ident)?;
        }
        Ok(self)
    }

    /// Render SQL with backend placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    out.push_str(&self.backend.placeholder(idx));
                }
            }
        }
        out
    }

    /// Render SQL with every bound value inlined as a literal.
    pub fn to_inline_sql(&self) -> String {
        let mut out = String::new();
        let mut params = self.params.iter();

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    match params.next() {
                        Some(v) => out.push_str(&render_literal(v, self.backend)),
                        None => out.push_str("NULL"),
                    }
                }
            }
        }
        out
    }

    /// Bound values, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
