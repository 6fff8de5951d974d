#![warn(missing_docs)]

//! Named SQL type descriptors.
//!
//! A [`DataType`] carries a host-language representative, optional
//! to-database/from-database [`Value`] converters, and a dialect-sensitive
//! SQL rendering. The nine built-in types mirror a `sqlite3.register_adapter`/
//! `register_converter`-style catalogue.

use crate::transpiler::ESqlDialect;
use crate::value::Value;

/// A `fn` pointer converting a [`Value`] to or from its database-storable form.
pub type ValueConverter = fn(&Value) -> Value;

/// A named SQL type descriptor.
#[derive(Clone, Copy, Debug)]
pub struct DataType {
    /// The type's canonical name, e.g. `"INTEGER"`.
    pub name: &'static str,
    /// An optional length/precision parameter distinguishing e.g.
    /// `VARCHAR(255)` from `VARCHAR(100)`. Parameterized data types are
    /// bound in place rather than deduplicated by name (see schema binding).
    pub parameter: Option<u32>,
    /// Converts a value to its database-storable form, applied before the
    /// column's own converter chain during insert/update.
    pub adapter: Option<ValueConverter>,
    /// Converts a stored value back to its host form, applied after the
    /// column's own converter chain during result decoding.
    pub converter: Option<ValueConverter>,
}

impl DataType {
    /// Declares a data type with no converters (the native numeric/text/blob types).
    const fn native(name: &'static str) -> Self {
        DataType {
            name,
            parameter: None,
            adapter: None,
            converter: None,
        }
    }

    /// Declares a data type with both an adapter and a converter.
    const fn convertible(
        name: &'static str,
        adapter: ValueConverter,
        converter: ValueConverter,
    ) -> Self {
        DataType {
            name,
            parameter: None,
            adapter: Some(adapter),
            converter: Some(converter),
        }
    }

    /// Returns a parameterized copy of this data type, e.g. `VARCHAR(255)`.
    pub fn with_parameter(mut self, parameter: u32) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Whether this is one of the handful of types every dialect renders
    /// identically (no adapter/converter, no dialect-specific spelling).
    pub fn is_native(&self) -> bool {
        matches!(self.name, "BLOB" | "INTEGER" | "NULL" | "REAL" | "TEXT")
    }

    /// Renders this data type's SQL spelling for a given output dialect.
    pub fn to_sql(&self, dialect: ESqlDialect) -> String {
        let base = match (self.name, dialect) {
            ("BOOLEAN", ESqlDialect::Sqlite) => "INTEGER",
            ("BOOLEAN", _) => "BOOLEAN",
            ("DATE", ESqlDialect::Sqlite) => "TEXT",
            ("DATE", _) => "DATE",
            ("DATETIME", ESqlDialect::Sqlite) => "TEXT",
            ("DATETIME", _) => "DATETIME",
            ("TIMESTAMP", ESqlDialect::Sqlite) => "REAL",
            ("TIMESTAMP", ESqlDialect::SqlServer) => "DATETIME2",
            ("TIMESTAMP", _) => "TIMESTAMP",
            ("TEXT", ESqlDialect::SqlServer) if self.parameter.is_some() => "NVARCHAR",
            (name, _) => name,
        };
        match self.parameter {
            Some(p) => format!("{base}({p})"),
            None => base.to_string(),
        }
    }

    fn bool_to_storage(value: &Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(if *b { 1 } else { 0 }),
            other => other.clone(),
        }
    }

    fn bool_from_storage(value: &Value) -> Value {
        match value {
            Value::Int(i) => Value::Bool(*i != 0),
            other => other.clone(),
        }
    }

    fn date_to_storage(value: &Value) -> Value {
        match value {
            Value::Date(d) => Value::String(
                d.format(&time::format_description::well_known::Iso8601::DATE)
                    .unwrap_or_default(),
            ),
            other => other.clone(),
        }
    }

    fn date_from_storage(value: &Value) -> Value {
        match value {
            Value::String(s) => time::Date::parse(s, &time::format_description::well_known::Iso8601::DATE)
                .map(Value::Date)
                .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        }
    }

    fn datetime_to_storage(value: &Value) -> Value {
        match value {
            Value::DateTime(dt) => Value::String(
                dt.format(&time::format_description::well_known::Iso8601::DATE_TIME)
                    .unwrap_or_default(),
            ),
            other => other.clone(),
        }
    }

    fn datetime_from_storage(value: &Value) -> Value {
        match value {
            Value::String(s) => time::PrimitiveDateTime::parse(
                s,
                &time::format_description::well_known::Iso8601::DATE_TIME,
            )
            .map(Value::DateTime)
            .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        }
    }

    fn timestamp_to_storage(value: &Value) -> Value {
        match value {
            Value::Timestamp(ts) => Value::Float(ts.unix_timestamp() as f64),
            other => other.clone(),
        }
    }

    fn timestamp_from_storage(value: &Value) -> Value {
        match value {
            Value::Float(secs) => time::OffsetDateTime::from_unix_timestamp(*secs as i64)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            Value::Int(secs) => time::OffsetDateTime::from_unix_timestamp(*secs)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
            other => other.clone(),
        }
    }
}

/// `BLOB` (raw bytes).
pub const BLOB: DataType = DataType::native("BLOB");
/// `BOOLEAN` (adapts to `0`/`1` storage).
pub const BOOLEAN: DataType =
    DataType::convertible("BOOLEAN", DataType::bool_to_storage, DataType::bool_from_storage);
/// `DATE` (adapts to/from an ISO-8601 date string).
pub const DATE: DataType =
    DataType::convertible("DATE", DataType::date_to_storage, DataType::date_from_storage);
/// `DATETIME` (adapts to/from an ISO-8601 date-time string).
pub const DATETIME: DataType = DataType::convertible(
    "DATETIME",
    DataType::datetime_to_storage,
    DataType::datetime_from_storage,
);
/// `INTEGER` (a whole number).
pub const INTEGER: DataType = DataType::native("INTEGER");
/// `NULL` (the type of the SQL `NULL` literal).
pub const NULL: DataType = DataType::native("NULL");
/// `REAL` (a floating point number).
pub const REAL: DataType = DataType::native("REAL");
/// `TEXT` (a string).
pub const TEXT: DataType = DataType::native("TEXT");
/// `TIMESTAMP` (adapts to/from a Unix epoch number).
pub const TIMESTAMP: DataType = DataType::convertible(
    "TIMESTAMP",
    DataType::timestamp_to_storage,
    DataType::timestamp_from_storage,
);

/// The built-in catalogue, in declaration order.
pub fn builtin() -> Vec<DataType> {
    vec![BLOB, BOOLEAN, DATE, DATETIME, INTEGER, NULL, REAL, TEXT, TIMESTAMP]
}

/// Looks up a built-in data type by name.
pub fn by_name(name: &str) -> Option<DataType> {
    builtin().into_iter().find(|dt| dt.name == name)
}
