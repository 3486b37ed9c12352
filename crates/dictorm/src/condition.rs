//! WHERE clause conditions.
//!
//! [`Conditions`] is either a column→value mapping (rendered as equality tests
//! joined by a [`Combinator`]) or a raw SQL fragment used verbatim.

use crate::dialect::{Backend, render_literal};
use crate::error::OrmResult;
use crate::ident::render_identifier;
use crate::statement::Statement;
use crate::value::{Row, Value};
use std::fmt;

/// Boolean keyword joining the pairs of a mapping condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Row filter for select/update/delete.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Conditions {
    /// No filter
    #[default]
    None,
    /// `column = value` pairs
    Map(Row),
    /// Raw SQL fragment (escape hatch).
    ///
    /// Inserted verbatim after ` where `; never pass untrusted input.
    Raw(String),
}

impl Conditions {
    /// Single `column = value` condition.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Conditions::Map(Row::new().with(column, value))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Conditions::Raw(sql.into())
    }

    /// Whether this renders to no WHERE clause at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Conditions::None => true,
            Conditions::Map(row) => row.is_empty(),
            Conditions::Raw(sql) => sql.trim().is_empty(),
        }
    }

    /// Append ` where ...` with bound values to `stmt`.
    ///
    /// Nothing is appended when the conditions are empty.
    pub fn push_where(&self, stmt: &mut Statement, combinator: Combinator) -> OrmResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        stmt.push(" where ");
        match self {
            Conditions::None => {}
            Conditions::Raw(sql) => {
                stmt.push(sql);
            }
            Conditions::Map(row) => {
                let sep = format!(" {combinator} ");
                for (i, (column, value)) in row.iter().enumerate() {
                    if i > 0 {
                        stmt.push(&sep);
                    }
                    stmt.push_ident(column.as_str())?;
                    if value.is_null() {
                        stmt.push(" is null");
                    } else {
                        stmt.push(" = ").push_bind(value.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<Row> for Conditions {
    fn from(row: Row) -> Self {
        Conditions::Map(row)
    }
}

impl From<&str> for Conditions {
    fn from(sql: &str) -> Self {
        Conditions::Raw(sql.to_string())
    }
}

impl From<String> for Conditions {
    fn from(sql: String) -> Self {
        Conditions::Raw(sql)
    }
}

impl<T: Into<Conditions>> From<Option<T>> for Conditions {
    fn from(v: Option<T>) -> Self {
        v.map_or(Conditions::None, Into::into)
    }
}

/// Render a WHERE clause with inline literals, including the leading ` where `.
///
/// Returns an empty string when `conditions` is empty.
pub fn build_where(
    conditions: &Conditions,
    combinator: Combinator,
    backend: Backend,
) -> OrmResult<String> {
    if conditions.is_empty() {
        return Ok(String::new());
    }
    match conditions {
        Conditions::None => Ok(String::new()),
        Conditions::Raw(sql) => Ok(format!(" where {sql}")),
        Conditions::Map(row) => {
            let pairs = row
                .iter()
                .map(|(column, value)| {
                    let ident = render_identifier(column, backend)?;
                    Ok(if value.is_null() {
                        format!("{ident} is null")
                    } else {
                        format!("{ident} = {}", render_literal(value, backend))
                    })
                })
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(format!(" where {}", pairs.join(&format!(" {combinator} "))))
        }
    }
}
