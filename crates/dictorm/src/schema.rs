//! Table schemas and column type inference.
//!
//! Tables are described by an explicit, ordered [`TableSchema`]. The older
//! template style, where a [`Row`] of example values stands in for the schema,
//! is supported through [`TableSchema::from_template`] and
//! [`infer_column_type`].

use crate::dialect::Backend;
use crate::value::{Row, Value};

/// Declared SQL type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Float,
    Text,
    /// Raw DDL fragment, rendered verbatim (including any nullability).
    Raw(String),
}

impl ColumnType {
    fn base_sql(&self) -> &str {
        match self {
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Raw(decl) => decl,
        }
    }
}

/// A single column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// Ignored for [`ColumnType::Raw`].
    pub nullable: bool,
}

impl ColumnDef {
    /// A nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    pub fn raw(name: impl Into<String>, decl: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Raw(decl.into()))
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Infer a column from an example value.
    ///
    /// A zero number or empty string yields a nullable column; a non-empty
    /// string is taken as a raw type declaration.
    pub fn from_example(name: impl Into<String>, example: &Value) -> Self {
        let name = name.into();
        match example {
            Value::Text(decl) if !decl.is_empty() => Self::raw(name, decl.clone()),
            Value::Text(_) | Value::Null => Self::new(name, ColumnType::Text),
            Value::Float(_) => Self::new(name, ColumnType::Float).nullable_if(example.is_zero()),
            Value::Int(_) => {
                let ty = if example.is_large_int() {
                    ColumnType::BigInt
                } else {
                    ColumnType::Int
                };
                Self::new(name, ty).nullable_if(example.is_zero())
            }
        }
    }

    fn nullable_if(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The type + nullability clause, e.g. `int not null`.
    pub fn declaration(&self) -> String {
        match &self.column_type {
            ColumnType::Raw(decl) => decl.clone(),
            ty if self.nullable => ty.base_sql().to_string(),
            ty => format!("{} not null", ty.base_sql()),
        }
    }
}

/// Map an example value to a column type declaration.
pub fn infer_column_type(example: &Value) -> String {
    ColumnDef::from_example("", example).declaration()
}

/// Ordered column list for `create table`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Build a schema from a template row of example values.
    pub fn from_template(template: &Row) -> Self {
        Self {
            columns: template
                .iter()
                .map(|(name, example)| ColumnDef::from_example(name.as_str(), example))
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Return a copy with `key_name` prepended as an auto-generated primary
    /// key column, unless the schema already declares it.
    pub fn with_primary_key(&self, key_name: &str, backend: Backend) -> Self {
        if self.contains(key_name) {
            return self.clone();
        }
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(ColumnDef::raw(key_name, backend.primary_key_decl()));
        columns.extend(self.columns.iter().cloned());
        Self { columns }
    }
}

impl FromIterator<ColumnDef> for TableSchema {
    fn from_iter<I: IntoIterator<Item = ColumnDef>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
