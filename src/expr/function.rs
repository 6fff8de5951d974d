#![warn(missing_docs)]

//! Aggregate functions.
//!
//! Grounded on `original_source/sqldatabase/sqlfunction.py`'s
//! `SqlAggregateFunction`/`SqlCount`/`SqlAggregateFunctionWithMandatoryColumn`
//! hierarchy, collapsed here into one struct parameterized by name, per the
//! "polymorphism over a closed set" design note: the per-subclass
//! difference was only ever "is a column required", not behavior.

use std::rc::Rc;

use crate::datatype::DataType;
use crate::schema::Column;
use crate::value::{Value, ValueConverter};

/// `COUNT`, `MIN`, `MAX`, `SUM`, or `AVG` applied to a column, or `COUNT(*)`.
#[derive(Clone)]
pub struct AggregateFunction {
    name: &'static str,
    column: Option<Rc<Column>>,
}

impl AggregateFunction {
    /// `COUNT(*)`.
    pub fn count() -> Self {
        AggregateFunction { name: "count", column: None }
    }

    /// `COUNT(column)`.
    pub fn count_column(column: Rc<Column>) -> Self {
        AggregateFunction { name: "count", column: Some(column) }
    }

    /// `MIN(column)`.
    pub fn min(column: Rc<Column>) -> Self {
        AggregateFunction { name: "min", column: Some(column) }
    }

    /// `MAX(column)`.
    pub fn max(column: Rc<Column>) -> Self {
        AggregateFunction { name: "max", column: Some(column) }
    }

    /// `SUM(column)`.
    pub fn sum(column: Rc<Column>) -> Self {
        AggregateFunction { name: "sum", column: Some(column) }
    }

    /// `AVG(column)`.
    pub fn avg(column: Rc<Column>) -> Self {
        AggregateFunction { name: "avg", column: Some(column) }
    }

    /// The function's operand column, if any (`COUNT(*)` has none).
    pub fn column(&self) -> Option<&Rc<Column>> {
        self.column.as_ref()
    }

    /// `FUNCTION.<name>` or `FUNCTION.<name>.COLUMN.<fqn>`.
    pub fn alias(&self) -> String {
        match &self.column {
            Some(c) => format!("FUNCTION.{}.{}", self.name, c.alias()),
            None => format!("FUNCTION.{}", self.name),
        }
    }

    /// `NAME(*)` or `NAME(col.fqn)`, also this function's rendered SQL.
    pub fn fully_qualified_name(&self) -> String {
        match &self.column {
            Some(c) => format!("{}({})", self.name.to_uppercase(), c.fully_qualified_name()),
            None => format!("{}(*)", self.name.to_uppercase()),
        }
    }

    /// This function's rendered SQL form, identical to
    /// [`AggregateFunction::fully_qualified_name`].
    pub fn to_sql(&self) -> String {
        self.fully_qualified_name()
    }

    /// The data type of this function's result, proxied from its column
    /// (used during result decoding). `None` for `COUNT(*)`, which decodes
    /// as a plain integer.
    pub fn data_type(&self) -> Option<Rc<DataType>> {
        self.column.as_ref().map(|c| c.data_type.clone())
    }

    /// The to-database converter proxied from this function's column, if any.
    pub fn to_database_converter(&self) -> Option<ValueConverter> {
        self.column.as_ref().and_then(|c| c.adapter)
    }

    /// The from-database converter proxied from this function's column, if any.
    pub fn from_database_converter(&self) -> Option<ValueConverter> {
        self.column.as_ref().and_then(|c| c.converter)
    }

    /// Applies this function's proxied to-database conversion pipeline.
    pub fn to_database_value(&self, value: &Value) -> Value {
        match &self.column {
            Some(c) => c.to_database_value(value),
            None => value.clone(),
        }
    }

    /// Applies this function's proxied from-database conversion pipeline.
    pub fn from_database_value(&self, value: &Value) -> Value {
        match &self.column {
            Some(c) => c.from_database_value(value),
            None => value.clone(),
        }
    }

    /// Generates a fresh bind parameter name, proxied from this function's
    /// column when it has one, or derived from its own name otherwise.
    pub fn generate_parameter_name(&self) -> String {
        match &self.column {
            Some(c) => c.generate_parameter_name(),
            None => {
                let salt = uuid::Uuid::new_v4().simple().to_string();
                format!("{}_{}", self.name, &salt[..8])
            }
        }
    }
}

impl PartialEq for AggregateFunction {
    fn eq(&self, other: &Self) -> bool {
        self.fully_qualified_name() == other.fully_qualified_name()
    }
}

impl Eq for AggregateFunction {}

impl std::hash::Hash for AggregateFunction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fully_qualified_name().hash(state);
    }
}
