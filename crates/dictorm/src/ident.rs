//! SQL identifier handling.
//!
//! [`Ident`] represents a table or column name, optionally dotted
//! (`schema.table`). Each part is rendered with the quoting style of the target
//! backend:
//!
//! - SQLite / MySQL: every part is wrapped in backticks (embedded backticks doubled)
//! - PostgreSQL: parts matching `[A-Za-z_][A-Za-z0-9_$]*` are emitted unquoted,
//!   anything else is double-quoted (embedded `"` doubled)
//!
//! # Example
//! ```
//! use dictorm::{Backend, Ident};
//!
//! let t = Ident::parse("main.users")?;
//! assert_eq!(t.to_sql(Backend::Sqlite), "`main`.`users`");
//! assert_eq!(t.to_sql(Backend::Postgres), "main.users");
//! # Ok::<(), dictorm::OrmError>(())
//! ```

use crate::dialect::Backend;
use crate::error::{OrmError, OrmResult};

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    /// A single-part identifier taken verbatim (no dot splitting).
    pub fn single(name: &str) -> OrmResult<Self> {
        validate_part(name)?;
        Ok(Self {
            parts: vec![name.to_string()],
        })
    }

    /// Parse an identifier string.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted parts (`"..."` or `` `...` ``) may contain dots; a doubled
    ///   quote character escapes itself
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::validation("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if let Some(&quote) = chars.peek().filter(|c| **c == '"' || **c == '`') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            if chars.peek() == Some(&quote) {
                                chars.next();
                                name.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '"' || c == '`' {
                    return Err(OrmError::validation(format!(
                        "Unexpected quote character in identifier: '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty identifier segment"));
            }
            parts.push(name);
        }

        Ok(Self { parts })
    }

    /// Render the identifier for `backend`.
    pub fn to_sql(&self, backend: Backend) -> String {
        let mut out = String::new();
        self.write_sql(backend, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, backend: Backend, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match backend {
                Backend::Sqlite | Backend::Mysql => push_quoted(out, part, '`'),
                Backend::Postgres if is_plain(part) => out.push_str(part),
                Backend::Postgres => push_quoted(out, part, '"'),
            }
        }
    }
}

fn validate_part(name: &str) -> OrmResult<()> {
    if name.is_empty() {
        return Err(OrmError::validation("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(OrmError::validation(
            "Identifier cannot contain NUL character",
        ));
    }
    Ok(())
}

/// `[A-Za-z_][A-Za-z0-9_$]*`
fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}

fn push_quoted(out: &mut String, name: &str, quote: char) {
    out.push(quote);
    for ch in name.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
}

/// Render a table or column name for `backend`.
pub fn render_identifier(name: &str, backend: Backend) -> OrmResult<String> {
    Ok(Ident::parse(name)?.to_sql(backend))
}

/// Convert an input into an [`Ident`].
///
/// This is mainly for ergonomics in builder APIs.
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}

impl IntoIdent for &String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_per_backend() {
        assert_eq!(render_identifier("users", Backend::Sqlite).unwrap(), "`users`");
        assert_eq!(render_identifier("users", Backend::Mysql).unwrap(), "`users`");
        assert_eq!(render_identifier("users", Backend::Postgres).unwrap(), "users");
    }

    #[test]
    fn dotted() {
        let ident = Ident::parse("public.users").unwrap();
        assert_eq!(ident.to_sql(Backend::Postgres), "public.users");
        assert_eq!(ident.to_sql(Backend::Mysql), "`public`.`users`");
    }

    #[test]
    fn postgres_quotes_non_plain_names() {
        assert_eq!(
            render_identifier("my table", Backend::Postgres).unwrap(),
            r#""my table""#
        );
        assert_eq!(render_identifier("my_var$1", Backend::Postgres).unwrap(), "my_var$1");
        assert_eq!(render_identifier("1st", Backend::Postgres).unwrap(), r#""1st""#);
    }

    #[test]
    fn backticks_are_doubled() {
        let ident = Ident::single("we`ird").unwrap();
        assert_eq!(ident.to_sql(Backend::Sqlite), "`we``ird`");
    }

    #[test]
    fn quoted_parts_may_contain_dots() {
        let ident = Ident::parse(r#""a.b".c"#).unwrap();
        assert_eq!(ident.parts, vec!["a.b".to_string(), "c".to_string()]);
        let ident = Ident::parse("`x``y`").unwrap();
        assert_eq!(ident.parts, vec!["x`y".to_string()]);
    }

    #[test]
    fn rejects_malformed() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse(r#""unclosed"#).is_err());
        assert!(Ident::parse("a\0b").is_err());
        assert!(Ident::parse("ab\"c").is_err());
        assert!(Ident::single("").is_err());
    }
}
