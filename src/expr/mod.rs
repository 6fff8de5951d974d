#![warn(missing_docs)]

//! The composable SQL fragment layer: conditions, filters, aggregate
//! functions, and joins, all carrying their own accumulated bind
//! parameters.

pub mod condition;
pub mod filter;
pub mod function;
pub mod join;

pub use condition::{ComparisonOperator, Condition, LogicalOperator, Operand, RightHandValue, SubselectOperand};
pub use filter::ColumnFilters;
pub use function::AggregateFunction;
pub use join::{Join, JoinType};

use crate::value::Value;

/// Renders a literal value as SQL text: strings are single-quoted with
/// embedded quotes doubled, `NULL` renders bare, everything else uses its
/// `Display` form. Grounded on `original_source/sqldatabase/sqlbase.py`'s
/// `value_to_sql`.
pub fn value_to_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}
