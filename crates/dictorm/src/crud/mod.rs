//! Dictionary-shaped CRUD operations.
//!
//! The statement builders in this module are pure functions of the backend
//! and their inputs; the [`Session`] methods build a statement and run it
//! through the session executor. Mutating methods commit when the session's
//! `autocommit` flag is set.
//!
//! ```ignore
//! use dictorm::{Select, Session, row};
//!
//! session.create_table_from_template("t_students", &row! { "name" => "", "age" => 1 }, "id", true).await?;
//! session.add_object("t_students", &row! { "name" => "Tom", "age" => 22 }).await?;
//! let tom = session.get_objects("t_students", &Select::new().filter(row! { "name" => "Tom" }).limit(1)).await?;
//! ```

use crate::condition::{Combinator, Conditions};
use crate::dialect::Backend;
use crate::driver::Connection;
use crate::error::{OrmError, OrmResult};
use crate::schema::TableSchema;
use crate::session::Session;
use crate::statement::Statement;
use crate::value::{Row, Value};

/// Column list of a select.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Columns {
    /// `*`
    #[default]
    All,
    /// Raw select list, e.g. `count(*) as count`
    Raw(String),
    /// Column names, rendered as quoted identifiers
    List(Vec<String>),
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "*" => Columns::All,
            raw => Columns::Raw(raw.to_string()),
        }
    }
}

impl From<String> for Columns {
    fn from(s: String) -> Self {
        Columns::from(s.as_str())
    }
}

impl From<Vec<String>> for Columns {
    fn from(cols: Vec<String>) -> Self {
        Columns::List(cols)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(cols: Vec<&str>) -> Self {
        Columns::List(cols.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(cols: [&str; N]) -> Self {
        Columns::List(cols.into_iter().map(String::from).collect())
    }
}

/// Options of [`Session::get_objects`].
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub columns: Columns,
    pub conditions: Conditions,
    pub combinator: Combinator,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Raw `order by` expression
    pub order: Option<String>,
    /// Raw `group by` expression
    pub group: Option<String>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, conditions: impl Into<Conditions>) -> Self {
        self.conditions = conditions.into();
        self
    }

    pub fn combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Join mapping conditions with `or`.
    pub fn any(self) -> Self {
        self.combinator(Combinator::Or)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn group_by(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// `select ... from <table> [where] [group by] [order by] [limit] [offset]`
pub fn select_statement(backend: Backend, table: &str, select: &Select) -> OrmResult<Statement> {
    let mut stmt = Statement::new(backend, "select ");
    match &select.columns {
        Columns::All => {
            stmt.push("*");
        }
        Columns::Raw(raw) => {
            stmt.push(raw);
        }
        Columns::List(cols) if cols.is_empty() => {
            stmt.push("*");
        }
        Columns::List(cols) => {
            stmt.push_ident_list(cols.iter())?;
        }
    }
    stmt.push(" from ").push_ident(table)?;
    select.conditions.push_where(&mut stmt, select.combinator)?;
    if let Some(group) = select.group.as_deref().filter(|g| !g.trim().is_empty()) {
        stmt.push(" group by ").push(group);
    }
    if let Some(order) = select.order.as_deref().filter(|o| !o.trim().is_empty()) {
        stmt.push(" order by ").push(order);
    }
    if let Some(limit) = select.limit {
        stmt.push(&format!(" limit {limit}"));
    }
    if let Some(offset) = select.offset {
        stmt.push(&format!(" offset {offset}"));
    }
    Ok(stmt)
}

/// `insert into <table>(<cols>) values(<values>)`, in row order.
pub fn insert_statement(backend: Backend, table: &str, obj: &Row) -> OrmResult<Statement> {
    if obj.is_empty() {
        return Err(OrmError::validation(format!(
            "insert into '{table}' requires at least one column"
        )));
    }
    let mut stmt = Statement::new(backend, "insert into ");
    stmt.push_ident(table)?.push("(");
    stmt.push_ident_list(obj.keys())?;
    stmt.push(") values(");
    stmt.push_bind_list(obj.values().cloned());
    stmt.push(")");
    Ok(stmt)
}

/// `update <table> set <col> = <value>, ... [where]`
pub fn update_statement(
    backend: Backend,
    table: &str,
    fields: &Row,
    conditions: &Conditions,
    combinator: Combinator,
) -> OrmResult<Statement> {
    if fields.is_empty() {
        return Err(OrmError::validation(format!(
            "update of '{table}' requires at least one column to set"
        )));
    }
    let mut stmt = Statement::new(backend, "update ");
    stmt.push_ident(table)?.push(" set ");
    for (i, (column, value)) in fields.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push_ident(column.as_str())?
            .push(" = ")
            .push_bind(value.clone());
    }
    conditions.push_where(&mut stmt, combinator)?;
    Ok(stmt)
}

/// `delete from <table> [where]`
pub fn delete_statement(
    backend: Backend,
    table: &str,
    conditions: &Conditions,
    combinator: Combinator,
) -> OrmResult<Statement> {
    let mut stmt = Statement::new(backend, "delete from ");
    stmt.push_ident(table)?;
    conditions.push_where(&mut stmt, combinator)?;
    Ok(stmt)
}

/// `create table if not exists <table>(<columns>, primary key (<key>))`
///
/// The key column is prepended with the backend's auto-increment declaration
/// when `schema` does not declare it.
pub fn create_table_statement(
    backend: Backend,
    table: &str,
    schema: &TableSchema,
    key_name: &str,
) -> OrmResult<Statement> {
    let schema = schema.with_primary_key(key_name, backend);
    let mut stmt = Statement::new(backend, "create table if not exists ");
    stmt.push_ident(table)?.push("(");
    for column in schema.columns() {
        stmt.push_ident(column.name.as_str())?
            .push(" ")
            .push(&column.declaration())
            .push(", ");
    }
    stmt.push("primary key (").push_ident(key_name)?.push("))");
    Ok(stmt)
}

/// Empty a table: `truncate table`, or `delete from` where truncate is missing.
pub fn reset_table_statement(backend: Backend, table: &str) -> OrmResult<Statement> {
    let head = if backend.supports_truncate() {
        "truncate table "
    } else {
        "delete from "
    };
    let mut stmt = Statement::new(backend, head);
    stmt.push_ident(table)?;
    Ok(stmt)
}

pub fn drop_table_statement(backend: Backend, table: &str, if_exists: bool) -> OrmResult<Statement> {
    let head = if if_exists {
        "drop table if exists "
    } else {
        "drop table "
    };
    let mut stmt = Statement::new(backend, head);
    stmt.push_ident(table)?;
    Ok(stmt)
}

/// Split the key column out of a single-object mapping.
///
/// Returns the remaining fields and the key value identifying the row. An
/// explicit `key_value` wins over the one stored in `obj`. The key column is
/// never part of the returned fields; `obj` itself is left untouched.
pub fn split_key(obj: &Row, key_value: Option<Value>, key_name: &str) -> OrmResult<(Row, Value)> {
    let mut fields = obj.clone();
    let stored = fields.remove(key_name);
    let key = key_value.or(stored).ok_or_else(|| {
        OrmError::validation(format!(
            "no value for key column '{key_name}': pass one or include it in the object"
        ))
    })?;
    Ok((fields, key))
}

impl<C: Connection> Session<C> {
    /// Fetch rows from `table`.
    ///
    /// Row order is whatever the database returns unless `select` orders it.
    pub async fn get_objects(&mut self, table: &str, select: &Select) -> OrmResult<Vec<Row>> {
        let stmt = select_statement(self.backend()?, table, select)?;
        self.fetch_statement(&stmt).await
    }

    /// Fetch the first row whose `key_name` equals `key_value`.
    pub async fn get_object(
        &mut self,
        table: &str,
        key_value: impl Into<Value>,
        key_name: &str,
    ) -> OrmResult<Option<Row>> {
        let select = Select::new().filter(Conditions::eq(key_name, key_value));
        let rows = self.get_objects(table, &select).await?;
        Ok(rows.into_iter().next())
    }

    /// [`Session::get_object`] on the `id` column.
    pub async fn get_object_by_id(
        &mut self,
        table: &str,
        id: impl Into<Value>,
    ) -> OrmResult<Option<Row>> {
        self.get_object(table, id, "id").await
    }

    /// Count rows matching `conditions`.
    pub async fn count_objects(
        &mut self,
        table: &str,
        conditions: impl Into<Conditions>,
        combinator: Combinator,
    ) -> OrmResult<i64> {
        let select = Select::new()
            .columns("count(*) as count")
            .filter(conditions)
            .combinator(combinator);
        let rows = self.get_objects(table, &select).await?;
        match rows.first() {
            Some(row) => row.try_get("count"),
            None => Ok(0),
        }
    }

    /// Insert one object.
    pub async fn add_object(&mut self, table: &str, obj: &Row) -> OrmResult<u64> {
        let stmt = insert_statement(self.backend()?, table, obj)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Update every row matching `conditions` with the columns of `obj`.
    pub async fn set_objects(
        &mut self,
        table: &str,
        obj: &Row,
        conditions: impl Into<Conditions>,
        combinator: Combinator,
    ) -> OrmResult<u64> {
        let stmt = update_statement(
            self.backend()?,
            table,
            obj,
            &conditions.into(),
            combinator,
        )?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Update the single row identified by the key column.
    ///
    /// The key comes from `key_value` if given, otherwise from `obj`.
    pub async fn set_object(
        &mut self,
        table: &str,
        obj: &Row,
        key_value: Option<Value>,
        key_name: &str,
    ) -> OrmResult<u64> {
        let (fields, key) = split_key(obj, key_value, key_name)?;
        self.set_objects(table, &fields, Conditions::eq(key_name, key), Combinator::And)
            .await
    }

    /// Delete every row matching `conditions`.
    ///
    /// Empty conditions delete every row.
    pub async fn del_objects(
        &mut self,
        table: &str,
        conditions: impl Into<Conditions>,
        combinator: Combinator,
    ) -> OrmResult<u64> {
        let stmt = delete_statement(self.backend()?, table, &conditions.into(), combinator)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Delete the single row identified by the key column.
    pub async fn del_object(
        &mut self,
        table: &str,
        obj: &Row,
        key_value: Option<Value>,
        key_name: &str,
    ) -> OrmResult<u64> {
        let (_, key) = split_key(obj, key_value, key_name)?;
        self.del_objects(table, Conditions::eq(key_name, key), Combinator::And)
            .await
    }

    /// Create a table from an explicit schema.
    ///
    /// With `new`, an existing table of that name is dropped first.
    pub async fn create_table(
        &mut self,
        table: &str,
        schema: &TableSchema,
        key_name: &str,
        new: bool,
    ) -> OrmResult<u64> {
        let backend = self.backend()?;
        if new {
            let drop = drop_table_statement(backend, table, true)?;
            self.execute_statement(&drop, false).await?;
        }
        let stmt = create_table_statement(backend, table, schema, key_name)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Create a table from a template object of example values.
    pub async fn create_table_from_template(
        &mut self,
        table: &str,
        template: &Row,
        key_name: &str,
        new: bool,
    ) -> OrmResult<u64> {
        let schema = TableSchema::from_template(template);
        self.create_table(table, &schema, key_name, new).await
    }

    /// Remove every row of `table`.
    pub async fn reset_table(&mut self, table: &str) -> OrmResult<u64> {
        let stmt = reset_table_statement(self.backend()?, table)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Drop `table`; fails if it does not exist.
    pub async fn drop_table(&mut self, table: &str) -> OrmResult<u64> {
        let stmt = drop_table_statement(self.backend()?, table, false)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }

    /// Drop `table` if it exists.
    pub async fn drop_table_if_exists(&mut self, table: &str) -> OrmResult<u64> {
        let stmt = drop_table_statement(self.backend()?, table, true)?;
        let commit = self.config().autocommit;
        self.execute_statement(&stmt, commit).await
    }
}

#[cfg(test)]
mod tests;
