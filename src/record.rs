#![warn(missing_docs)]

//! Records: ordered mappings from schema objects to values.
//!
//! Grounded on `original_source/sqldatabase/sqlrecord.py`'s
//! `SqlRecord(MutableMapping)`. Keys are columns or aggregate functions, not
//! raw strings (the same objects the schema model already hands out), so a
//! `Record` built from one query's results can be handed straight to
//! another statement without re-stringifying column names.

use std::rc::Rc;

use base64::Engine;

use crate::datatype::DataType;
use crate::expr::AggregateFunction;
use crate::schema::{Column, Database};
use crate::value::Value;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// A record key: either a column or an aggregate function, never a raw
/// name.
#[derive(Clone)]
pub enum RecordKey {
    /// A column.
    Column(Rc<Column>),
    /// An aggregate function.
    Function(AggregateFunction),
}

impl RecordKey {
    /// This key's projection alias, e.g. `COLUMN.app.words.id`.
    pub fn alias(&self) -> String {
        match self {
            RecordKey::Column(c) => c.alias(),
            RecordKey::Function(f) => f.alias(),
        }
    }

    fn data_type(&self) -> Option<Rc<DataType>> {
        match self {
            RecordKey::Column(c) => Some(c.data_type.clone()),
            RecordKey::Function(f) => f.data_type(),
        }
    }

    pub(crate) fn generate_parameter_name(&self) -> String {
        match self {
            RecordKey::Column(c) => c.generate_parameter_name(),
            RecordKey::Function(f) => f.generate_parameter_name(),
        }
    }

    pub(crate) fn to_database_value(&self, value: &Value) -> Value {
        match self {
            RecordKey::Column(c) => c.to_database_value(value),
            RecordKey::Function(f) => f.to_database_value(value),
        }
    }

    pub(crate) fn from_database_value(&self, value: &Value) -> Value {
        match self {
            RecordKey::Column(c) => c.from_database_value(value),
            RecordKey::Function(f) => f.from_database_value(value),
        }
    }

    /// This key's rendered SQL form: a column's fully qualified name, or a
    /// function's `NAME(...)` form. Used by statement builders to project
    /// `SELECT`/`GROUP BY`/`ORDER BY` items.
    pub(crate) fn to_sql(&self) -> String {
        match self {
            RecordKey::Column(c) => c.fully_qualified_name(),
            RecordKey::Function(f) => f.to_sql(),
        }
    }

    /// The bare column name, for statement builders that target a single
    /// table column (`InsertInto`/`Update`). `None` for an aggregate
    /// function key, which never names an insert/update target.
    pub(crate) fn column_name(&self) -> Option<&str> {
        match self {
            RecordKey::Column(c) => Some(c.name.as_str()),
            RecordKey::Function(_) => None,
        }
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.alias() == other.alias()
    }
}

impl From<Rc<Column>> for RecordKey {
    fn from(column: Rc<Column>) -> Self {
        RecordKey::Column(column)
    }
}

impl From<AggregateFunction> for RecordKey {
    fn from(function: AggregateFunction) -> Self {
        RecordKey::Function(function)
    }
}

/// An ordered `Column | AggregateFunction` → `Value` mapping.
///
/// Used both as input (insert/update) and output (select decoding).
/// Insertion order is preserved; re-setting an existing key updates its
/// value in place without moving it.
#[derive(Default, Clone)]
pub struct Record {
    entries: Vec<(RecordKey, Value)>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Record::default()
    }

    /// Sets `key`'s value, appending if new or updating in place if present.
    pub fn set(&mut self, key: impl Into<RecordKey>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &RecordKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Generates a fresh parameter name per entry and applies each key's
    /// to-database conversion pipeline (own converter, then data type's
    /// adapter), producing the named map an `InsertInto`/`Update` statement
    /// binds. Mirrors `SqlRecord.generate_parameters`.
    pub fn to_database_parameters(&self) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .map(|(key, value)| {
                let name = key.generate_parameter_name();
                let converted = key.to_database_value(value);
                (name, converted)
            })
            .collect()
    }

    /// Serializes this record to a JSON object keyed by each entry's alias,
    /// with bytes encoded as base64 and date/time values as ISO-8601
    /// strings.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.entries {
            map.insert(key.alias(), value_to_json(value));
        }
        serde_json::Value::Object(map)
    }

    /// Decodes one cursor row into a `Record`, resolving each `(alias,
    /// value)` pair against `database`'s live schema and applying the
    /// resolved key's from-database conversion pipeline. This is how a
    /// `Select`'s results come back keyed by `Column`/`AggregateFunction`
    /// objects rather than raw column names.
    pub fn from_row(
        database: &Database,
        aliases: &[String],
        values: Vec<Value>,
    ) -> Result<Record, String> {
        let mut record = Record::new();
        for (alias, value) in aliases.iter().zip(values) {
            let key = resolve_alias(database, alias)?;
            let decoded = key.from_database_value(&value);
            record.entries.push((key, decoded));
        }
        Ok(record)
    }

    /// Deserializes a JSON object produced by [`Record::to_json`] back into
    /// a `Record`, resolving each alias against `database`'s live schema and
    /// using the resolved key's data type to reverse the bytes/date-time
    /// encoding.
    pub fn from_json(database: &Database, json: &serde_json::Value) -> Result<Record, String> {
        let object = json.as_object().ok_or("expected a JSON object")?;
        let mut record = Record::new();
        for (alias, value) in object {
            let key = resolve_alias(database, alias)?;
            let data_type = key.data_type();
            let parsed = value_from_json(value, data_type.as_deref());
            record.entries.push((key, parsed));
        }
        Ok(record)
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::Bool(b) => serde_json::Value::from(*b),
        Value::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
        Value::Date(d) => serde_json::Value::String(
            d.format(&time::format_description::well_known::Iso8601::DATE)
                .unwrap_or_default(),
        ),
        Value::DateTime(dt) => serde_json::Value::String(
            dt.format(&time::format_description::well_known::Iso8601::DATE_TIME)
                .unwrap_or_default(),
        ),
        Value::Timestamp(ts) => serde_json::Value::String(
            ts.format(&time::format_description::well_known::Iso8601::DATE_TIME)
                .unwrap_or_default(),
        ),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Between(lo, hi) => serde_json::Value::Array(vec![value_to_json(lo), value_to_json(hi)]),
        Value::Null => serde_json::Value::Null,
    }
}

fn value_from_json(value: &serde_json::Value, data_type: Option<&DataType>) -> Value {
    match (value, data_type.map(|dt| dt.name)) {
        (serde_json::Value::Null, _) => Value::Null,
        (serde_json::Value::Bool(b), _) => Value::Bool(*b),
        (serde_json::Value::String(s), Some("BLOB")) => BASE64
            .decode(s)
            .map(Value::Bytes)
            .unwrap_or_else(|_| Value::String(s.clone())),
        (serde_json::Value::String(s), Some("DATE")) => {
            time::Date::parse(s, &time::format_description::well_known::Iso8601::DATE)
                .map(Value::Date)
                .unwrap_or_else(|_| Value::String(s.clone()))
        }
        (serde_json::Value::String(s), Some("DATETIME")) => time::PrimitiveDateTime::parse(
            s,
            &time::format_description::well_known::Iso8601::DATE_TIME,
        )
        .map(Value::DateTime)
        .unwrap_or_else(|_| Value::String(s.clone())),
        (serde_json::Value::String(s), Some("TIMESTAMP")) => time::OffsetDateTime::parse(
            s,
            &time::format_description::well_known::Iso8601::DATE_TIME,
        )
        .map(Value::Timestamp)
        .unwrap_or_else(|_| Value::String(s.clone())),
        (serde_json::Value::String(s), _) => Value::String(s.clone()),
        (serde_json::Value::Number(n), _) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        (serde_json::Value::Array(items), _) => {
            Value::Array(items.iter().map(|v| value_from_json(v, data_type)).collect())
        }
        (serde_json::Value::Object(_), _) => Value::Null,
    }
}

/// Parses an alias and resolves it against `database`'s live schema.
fn resolve_alias(database: &Database, alias: &str) -> Result<RecordKey, String> {
    if let Some(rest) = alias.strip_prefix("COLUMN.") {
        let parts: Vec<&str> = rest.split('.').collect();
        if parts.len() < 3 {
            return Err(format!("malformed column alias: {alias}"));
        }
        let column_name = parts[parts.len() - 1];
        let table_name = parts[parts.len() - 2];
        let table = database
            .table(table_name)
            .or_else(|| {
                database
                    .attached_databases()
                    .iter()
                    .find_map(|attached| attached.table(table_name))
            })
            .ok_or_else(|| format!("unknown table in alias: {alias}"))?;
        let column = table
            .column(column_name)
            .ok_or_else(|| format!("unknown column in alias: {alias}"))?;
        return Ok(RecordKey::Column(column));
    }
    if let Some(rest) = alias.strip_prefix("FUNCTION.") {
        if let Some((fname, column_alias)) = rest.split_once(".COLUMN.") {
            let column = match resolve_alias(database, &format!("COLUMN.{column_alias}"))? {
                RecordKey::Column(c) => c,
                RecordKey::Function(_) => unreachable!(),
            };
            let function = match fname {
                "count" => AggregateFunction::count_column(column),
                "min" => AggregateFunction::min(column),
                "max" => AggregateFunction::max(column),
                "sum" => AggregateFunction::sum(column),
                "avg" => AggregateFunction::avg(column),
                other => return Err(format!("unknown aggregate function: {other}")),
            };
            return Ok(RecordKey::Function(function));
        }
        if rest == "count" {
            return Ok(RecordKey::Function(AggregateFunction::count()));
        }
        return Err(format!("malformed function alias: {alias}"));
    }
    Err(format!("unrecognised alias: {alias}"))
}
