//! `tokio-postgres` adapter.

use super::{Connection, Cursor};
use crate::dialect::Backend;
use crate::error::{OrmError, OrmResult};
use crate::value::{Row, Value};
use bytes::{BufMut, BytesMut};
use std::error::Error;
use std::sync::Arc;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};

/// A PostgreSQL connection backed by a shared `tokio_postgres::Client`.
///
/// tokio-postgres runs every statement in autocommit mode, so
/// [`Connection::commit`] is a no-op.
#[derive(Debug, Clone)]
pub struct PgConnection {
    client: Arc<Client>,
}

impl PgConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn from_arc(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Connect without TLS and drive the connection on a background task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let conn = PgConnection::connect("postgres://postgres@localhost/app").await?;
    /// let mut session = Session::connect(conn, SessionConfig::default()).await?;
    /// ```
    pub async fn connect(database_url: &str) -> OrmResult<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "dictorm.session", error = %e, "postgres connection closed with error");
            }
        });
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Connection for PgConnection {
    type Cursor = PgCursor;

    fn backend(&self) -> OrmResult<Backend> {
        Ok(Backend::Postgres)
    }

    async fn cursor(&self) -> OrmResult<PgCursor> {
        if self.client.is_closed() {
            return Err(OrmError::driver("postgres connection is closed"));
        }
        Ok(PgCursor {
            client: Arc::clone(&self.client),
        })
    }

    async fn ping(&self) -> OrmResult<()> {
        self.client.simple_query("select 1").await?;
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        Ok(())
    }
}

/// Cursor over a shared client.
#[derive(Debug)]
pub struct PgCursor {
    client: Arc<Client>,
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Cursor for PgCursor {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let refs = param_refs(params);
        Ok(self.client.execute(sql, &refs).await?)
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = self.client.query(sql, &refs).await?;
        rows.iter().map(decode_row).collect()
    }
}

/// Column categories this adapter converts to and from [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PgKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Decoded as text, since `Value` has no exact decimal.
    Numeric,
    Text,
}

impl PgKind {
    fn of(ty: &Type) -> Option<Self> {
        let kind = if *ty == Type::BOOL {
            PgKind::Bool
        } else if *ty == Type::INT2 {
            PgKind::Int2
        } else if *ty == Type::INT4 {
            PgKind::Int4
        } else if *ty == Type::INT8 {
            PgKind::Int8
        } else if *ty == Type::FLOAT4 {
            PgKind::Float4
        } else if *ty == Type::FLOAT8 {
            PgKind::Float8
        } else if *ty == Type::NUMERIC {
            PgKind::Numeric
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
            || *ty == Type::UNKNOWN
        {
            PgKind::Text
        } else {
            return None;
        };
        Some(kind)
    }
}

fn decode_row(row: &tokio_postgres::Row) -> OrmResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let decode_err = |e: tokio_postgres::Error| OrmError::decode(name, e.to_string());
        let value: Value = match PgKind::of(column.type_()) {
            Some(PgKind::Bool) => row.try_get::<_, Option<bool>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Int2) => row.try_get::<_, Option<i16>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Int4) => row.try_get::<_, Option<i32>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Int8) => row.try_get::<_, Option<i64>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Float4) => row.try_get::<_, Option<f32>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Float8) => row.try_get::<_, Option<f64>>(idx).map_err(decode_err)?.into(),
            Some(PgKind::Numeric) => row
                .try_get::<_, Option<NumericText>>(idx)
                .map_err(decode_err)?
                .map(|n| n.0)
                .into(),
            Some(PgKind::Text) => row
                .try_get::<_, Option<String>>(idx)
                .map_err(decode_err)?
                .into(),
            None => {
                return Err(OrmError::decode(
                    name,
                    format!("unsupported column type '{}'", column.type_()),
                ));
            }
        };
        out.insert(name, value);
    }
    Ok(out)
}

/// Values bind to whatever type the server inferred for the placeholder,
/// converting between numbers and text the way literal casting would.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }
        let Some(kind) = PgKind::of(ty) else {
            return Err(format!("cannot bind value to postgres type '{ty}'").into());
        };
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => match kind {
                PgKind::Bool => (*v != 0).to_sql(ty, out),
                PgKind::Int2 => i16::try_from(*v)?.to_sql(ty, out),
                PgKind::Int4 => i32::try_from(*v)?.to_sql(ty, out),
                PgKind::Int8 => v.to_sql(ty, out),
                PgKind::Float4 => (*v as f32).to_sql(ty, out),
                PgKind::Float8 => (*v as f64).to_sql(ty, out),
                PgKind::Numeric => encode_numeric(&v.to_string(), out),
                PgKind::Text => v.to_string().to_sql(ty, out),
            },
            Value::Float(v) => match kind {
                PgKind::Float4 => (*v as f32).to_sql(ty, out),
                PgKind::Float8 => v.to_sql(ty, out),
                PgKind::Numeric => encode_numeric(&v.to_string(), out),
                PgKind::Text => v.to_string().to_sql(ty, out),
                _ if v.fract() == 0.0 => Value::Int(*v as i64).to_sql(ty, out),
                _ => Err(format!("cannot bind fractional value {v} to postgres type '{ty}'").into()),
            },
            Value::Text(s) => match kind {
                PgKind::Text => s.to_sql(ty, out),
                PgKind::Bool => match s.trim().to_ascii_lowercase().as_str() {
                    "t" | "true" | "1" | "yes" | "on" => true.to_sql(ty, out),
                    "f" | "false" | "0" | "no" | "off" => false.to_sql(ty, out),
                    other => Err(format!("invalid boolean text '{other}'").into()),
                },
                PgKind::Int2 | PgKind::Int4 | PgKind::Int8 => {
                    Value::Int(s.trim().parse()?).to_sql(ty, out)
                }
                PgKind::Float4 | PgKind::Float8 => Value::Float(s.trim().parse()?).to_sql(ty, out),
                PgKind::Numeric => encode_numeric(s, out),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        PgKind::of(ty).is_some()
    }

    to_sql_checked!();
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// `numeric` in its decimal text form.
///
/// Binary layout: ndigits, weight, sign, dscale, then base-10000 digits,
/// all big-endian 16-bit.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        decode_numeric(raw).map(NumericText)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn decode_numeric(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let read = |at: usize| -> Result<u16, Box<dyn Error + Sync + Send>> {
        match raw.get(at..at + 2) {
            Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
            None => Err("truncated numeric value".into()),
        }
    };
    let ndigits = read(0)? as usize;
    let weight = read(2)? as i16 as i32;
    let sign = read(4)?;
    let dscale = read(6)? as usize;
    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign {other:#x}").into()),
    }
    let digits = (0..ndigits)
        .map(|i| read(8 + 2 * i))
        .collect::<Result<Vec<_>, _>>()?;
    let digit = |idx: i32| -> u16 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit(0).to_string());
        for idx in 1..=weight {
            out.push_str(&format!("{:04}", digit(idx)));
        }
    }
    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", digit(idx)));
            idx += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

fn encode_numeric(text: &str, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let well_formed = !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(format!("invalid numeric text '{text}'").into());
    }

    let int_part = int_part.trim_start_matches('0');
    let int_pad = (4 - int_part.len() % 4) % 4;
    let frac_pad = (4 - frac_part.len() % 4) % 4;
    let mut padded = String::with_capacity(int_pad + body.len() + frac_pad);
    padded.extend(std::iter::repeat_n('0', int_pad));
    padded.push_str(int_part);
    padded.push_str(frac_part);
    padded.extend(std::iter::repeat_n('0', frac_pad));

    let mut digits: Vec<i16> = padded
        .as_bytes()
        .chunks(4)
        .map(|group| group.iter().fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0')))
        .collect();
    let mut weight = i16::try_from((int_pad + int_part.len()) / 4)? - 1;
    while digits.first() == Some(&0) {
        digits.remove(0);
        weight -= 1;
    }
    while digits.last() == Some(&0) {
        digits.pop();
    }
    if digits.is_empty() {
        weight = 0;
    }

    out.put_i16(i16::try_from(digits.len())?);
    out.put_i16(weight);
    out.put_u16(if negative && !digits.is_empty() {
        NUMERIC_NEG
    } else {
        NUMERIC_POS
    });
    out.put_u16(u16::try_from(frac_part.len())?);
    for d in digits {
        out.put_i16(d);
    }
    Ok(IsNull::No)
}
