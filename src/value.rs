#![warn(missing_docs)]

//! A type-erased value that flows between [`crate::schema::Column`]s,
//! [`crate::record::Record`]s, and a backend [`crate::connection::Cursor`].
//!
//! `Value` covers exactly the host-language representatives named by the
//! built-in [`crate::datatype`] catalogue, plus `Array` (used for `IN`
//! lists) and `Between` (used for the two-value `BETWEEN` operand).

use std::fmt::Display;

/// A single database value, type-erased across the data types this crate
/// understands natively.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Text.
    String(String),
    /// A whole number. The canonical host representative for `INTEGER`.
    Int(i64),
    /// A floating point number. The canonical host representative for `REAL`.
    Float(f64),
    /// A boolean. Adapts to `0`/`1` on dialects without a native boolean.
    Bool(bool),
    /// Raw bytes, for `BLOB` columns.
    Bytes(Vec<u8>),
    /// A calendar date, for `DATE` columns.
    Date(time::Date),
    /// A date and time without a fixed offset, for `DATETIME` columns.
    DateTime(time::PrimitiveDateTime),
    /// An absolute instant, for `TIMESTAMP` columns (stored as Unix epoch seconds).
    Timestamp(time::OffsetDateTime),
    /// A list of values, used on the right-hand side of `IN`/`NOT IN`.
    Array(Vec<Value>),
    /// The SQL `NULL`.
    Null,
    /// A lower/upper pair, used on the right-hand side of `BETWEEN`.
    Between(Box<Value>, Box<Value>),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bytes(b) => write!(f, "{}", base64::Engine::encode(&BASE64, b)),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::Array(items) => write!(f, "{items:?}"),
            Value::Between(lo, hi) => write!(f, "BETWEEN {lo} AND {hi}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<time::Date> for Value {
    fn from(d: time::Date) -> Self {
        Value::Date(d)
    }
}

impl From<time::PrimitiveDateTime> for Value {
    fn from(dt: time::PrimitiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<time::OffsetDateTime> for Value {
    fn from(ts: time::OffsetDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Value> for String {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(()),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) => Ok(i),
            _ => Err(()),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) if i >= i32::MIN as i64 && i <= i32::MAX as i64 => Ok(i as i32),
            _ => Err(()),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            _ => Err(()),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(b),
            _ => Err(()),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = ();

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bytes(b) => Ok(b),
            _ => Err(()),
        }
    }
}
