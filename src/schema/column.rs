#![warn(missing_docs)]

//! Column declarations and bound columns.
//!
//! A [`ColumnDef`] is the unbound, builder-style declaration an application
//! writes down. [`DatabaseBuilder::build`](crate::schema::DatabaseBuilder::build)
//! turns a tree of `ColumnDef`s into [`Column`]s wired into a live
//! [`Database`](crate::schema::Database), with back-references to both.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::datatype::DataType;
use crate::expr::filter::ColumnFilters;
use crate::value::{Value, ValueConverter};

/// An unbound column declaration.
///
/// `ColumnDef`s are assembled into a [`TableDef`](crate::schema::TableDef) and
/// given to a [`DatabaseBuilder`](crate::schema::DatabaseBuilder); binding
/// produces the [`Column`] objects applications actually query with.
#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) primary_key: bool,
    pub(crate) autoincrement: bool,
    pub(crate) not_null: bool,
    pub(crate) unique: bool,
    pub(crate) default: Option<Value>,
    pub(crate) reference: Option<(String, String)>,
    pub(crate) values: Option<Vec<Value>>,
    pub(crate) adapter: Option<ValueConverter>,
    pub(crate) converter: Option<ValueConverter>,
}

impl ColumnDef {
    /// Declares a column by looking up its data type by name in the
    /// built-in catalogue (`crate::datatype::by_name`). Fails with
    /// [`crate::error::SchemaError::UnknownDataType`] if no such type is
    /// registered. This is the path a dynamically-configured schema (one that
    /// reads column types from strings rather than Rust source) would use.
    pub fn try_new(
        name: impl Into<String>,
        type_name: &str,
    ) -> Result<Self, crate::error::SchemaError> {
        let data_type = crate::datatype::by_name(type_name).ok_or_else(|| {
            crate::error::SchemaError::UnknownDataType {
                name: type_name.to_string(),
            }
        })?;
        Ok(Self::new(name, data_type))
    }

    /// Declares a column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        ColumnDef {
            name: name.into(),
            data_type,
            primary_key: false,
            autoincrement: false,
            not_null: false,
            unique: false,
            default: None,
            reference: None,
            values: None,
            adapter: None,
            converter: None,
        }
    }

    /// Marks this column as the table's primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Marks this column `AUTOINCREMENT`.
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Marks this column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks this column `UNIQUE`.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets this column's default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declares this column a foreign key referencing `table.column`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.reference = Some((table.into(), column.into()));
        self
    }

    /// Restricts this column to a discrete set of allowed values (an
    /// enum-like column). Conflicts with an explicit `adapter`/`converter`
    /// pair: when `values` is set, the adapter/converter default to the
    /// identity and membership check respectively.
    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.values = Some(values);
        self
    }

    /// Sets a user-supplied to-database value converter, applied before the
    /// data type's own adapter.
    pub fn adapter(mut self, adapter: ValueConverter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Sets a user-supplied from-database value converter, applied after the
    /// data type's own converter.
    pub fn converter(mut self, converter: ValueConverter) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// A column bound to a live table and database.
///
/// Back-references are [`Weak`] (a `Column` does not keep its table alive);
/// the reference is logically weak and is never copied by value.
pub struct Column {
    /// The column's bare name.
    pub name: String,
    /// The column's data type, deduplicated-by-name within its database for
    /// non-parameterized types (see schema binding).
    pub data_type: Rc<DataType>,
    /// Whether this column is the table's primary key.
    pub primary_key: bool,
    /// Whether this column auto-increments.
    pub autoincrement: bool,
    /// Whether this column is `NOT NULL`.
    pub not_null: bool,
    /// Whether this column is `UNIQUE`.
    pub unique: bool,
    /// This column's default value, if any.
    pub default: Option<Value>,
    /// The discrete set of allowed values, if this is an enum-like column.
    pub values: Option<Vec<Value>>,
    /// A user-supplied to-database converter, applied before the data
    /// type's own adapter.
    pub adapter: Option<ValueConverter>,
    /// A user-supplied from-database converter, applied after the data
    /// type's own converter.
    pub converter: Option<ValueConverter>,
    pub(crate) reference: RefCell<Option<Weak<Column>>>,
    pub(crate) foreign_keys: RefCell<Vec<Weak<Column>>>,
    pub(crate) table: RefCell<Weak<super::Table>>,
    /// The column's factory of ready-made [`crate::expr::Condition`]s.
    pub filters: ColumnFilters,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("data_type", &self.data_type.name)
            .field("primary_key", &self.primary_key)
            .field("not_null", &self.not_null)
            .finish()
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.table_name() == other.table_name()
    }
}

impl Eq for Column {}

impl std::hash::Hash for Column {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.table_name().hash(state);
    }
}

impl Column {
    pub(crate) fn table_name(&self) -> String {
        self.table
            .borrow()
            .upgrade()
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    /// The owning table, if it is still alive.
    pub fn table(&self) -> Option<Rc<super::Table>> {
        self.table.borrow().upgrade()
    }

    /// The column this one references, if it is a foreign key and its
    /// target is still alive.
    pub fn reference(&self) -> Option<Rc<Column>> {
        self.reference.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Columns elsewhere in the database that reference this one, still alive.
    pub fn foreign_keys(&self) -> Vec<Rc<Column>> {
        self.foreign_keys
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// `COLUMN.<fully_qualified_name>`: this column's projection alias.
    pub fn alias(&self) -> String {
        format!("COLUMN.{}", self.fully_qualified_name())
    }

    /// `database[.schema].table.column`.
    pub fn fully_qualified_name(&self) -> String {
        match self.table() {
            Some(table) => format!("{}.{}", table.fully_qualified_name(), self.name),
            None => self.name.clone(),
        }
    }

    /// Generates a fresh, process-wide-unique bind parameter name derived
    /// from this column's fully qualified name, salted with 8 hex digits of
    /// a random UUID (mirroring the original's `uuid4().hex[:8]` salting).
    pub fn generate_parameter_name(&self) -> String {
        let fqn = self.fully_qualified_name().replace('.', "_");
        let salt = uuid::Uuid::new_v4().simple().to_string();
        format!("{fqn}_{}", &salt[..8])
    }

    /// Applies this column's adapter, then its data type's adapter, to
    /// `value`: the value-to-database conversion pipeline used for bind
    /// parameters and default rendering.
    pub fn to_database_value(&self, value: &Value) -> Value {
        let mut v = value.clone();
        if let Some(adapter) = self.adapter {
            v = adapter(&v);
        }
        if let Some(adapter) = self.data_type.adapter {
            v = adapter(&v);
        }
        v
    }

    /// Applies this column's data type's converter, then its own converter,
    /// to `value`: the value-from-database decoding pipeline, the inverse
    /// order of [`Column::to_database_value`].
    pub fn from_database_value(&self, value: &Value) -> Value {
        let mut v = value.clone();
        if let Some(converter) = self.data_type.converter {
            v = converter(&v);
        }
        if let Some(converter) = self.converter {
            v = converter(&v);
        }
        v
    }

    /// Renders this column's default value as a SQL literal, applying its
    /// conversion pipeline first.
    pub fn default_to_sql(&self) -> Option<String> {
        self.default.as_ref().map(|v| {
            let converted = self.to_database_value(v);
            crate::expr::value_to_sql(&converted)
        })
    }
}
