#![warn(missing_docs)]

//! The per-column ready-made [`Condition`] factory.
//!
//! Grounded on `original_source/sqldatabase/sqlcolumnfilter.py`'s
//! `SqlColumnFilters` and its fourteen-method surface.

use std::rc::{Rc, Weak};
use std::cell::RefCell;

use crate::schema::Column;
use crate::value::Value;

use super::condition::{ComparisonOperator, Condition, Operand, RightHandValue};

/// A column's factory of pre-packaged [`Condition`]s, one method per
/// comparison operator. Constructed empty during schema binding and bound
/// to its owning column immediately afterward (see
/// `DatabaseBuilder::build`), since the column itself does not exist yet
/// when its `ColumnFilters` is first allocated.
pub struct ColumnFilters {
    column: RefCell<Weak<Column>>,
}

impl ColumnFilters {
    pub(crate) fn new() -> Self {
        ColumnFilters {
            column: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn bind(&self, column: Weak<Column>) {
        *self.column.borrow_mut() = column;
    }

    fn column(&self) -> Rc<Column> {
        self.column
            .borrow()
            .upgrade()
            .expect("ColumnFilters used before its column was bound, or after it was dropped")
    }

    fn comparison(&self, operator: ComparisonOperator, values: Vec<RightHandValue>) -> Condition {
        Condition::build_unchecked(Operand::Column(self.column()), operator, values)
    }

    /// `column = value`
    pub fn is_equal(&self, value: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::Equal, vec![RightHandValue::Literal(value.into())])
    }

    /// `column != value`
    pub fn is_not_equal(&self, value: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::NotEqual, vec![RightHandValue::Literal(value.into())])
    }

    /// `column < value`
    pub fn is_less_than(&self, value: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::LessThan, vec![RightHandValue::Literal(value.into())])
    }

    /// `column <= value`
    pub fn is_less_than_or_equal(&self, value: impl Into<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::LessThanOrEqual,
            vec![RightHandValue::Literal(value.into())],
        )
    }

    /// `column > value`
    pub fn is_greater_than(&self, value: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::GreaterThan, vec![RightHandValue::Literal(value.into())])
    }

    /// `column >= value`
    pub fn is_greater_than_or_equal(&self, value: impl Into<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::GreaterThanOrEqual,
            vec![RightHandValue::Literal(value.into())],
        )
    }

    /// `column LIKE pattern`
    pub fn is_like(&self, pattern: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::Like, vec![RightHandValue::Literal(pattern.into())])
    }

    /// `column NOT LIKE pattern`
    pub fn is_not_like(&self, pattern: impl Into<Value>) -> Condition {
        self.comparison(ComparisonOperator::NotLike, vec![RightHandValue::Literal(pattern.into())])
    }

    /// `column IN (values...)`
    pub fn is_in(&self, values: Vec<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::In,
            values.into_iter().map(RightHandValue::Literal).collect(),
        )
    }

    /// `column NOT IN (values...)`
    pub fn is_not_in(&self, values: Vec<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::NotIn,
            values.into_iter().map(RightHandValue::Literal).collect(),
        )
    }

    /// `column BETWEEN lo AND hi`
    pub fn is_between(&self, lo: impl Into<Value>, hi: impl Into<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::Between,
            vec![RightHandValue::Literal(lo.into()), RightHandValue::Literal(hi.into())],
        )
    }

    /// `column NOT BETWEEN lo AND hi`
    pub fn is_not_between(&self, lo: impl Into<Value>, hi: impl Into<Value>) -> Condition {
        self.comparison(
            ComparisonOperator::NotBetween,
            vec![RightHandValue::Literal(lo.into()), RightHandValue::Literal(hi.into())],
        )
    }

    /// `column IS NULL`
    pub fn is_null(&self) -> Condition {
        self.comparison(ComparisonOperator::IsNull, vec![])
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(&self) -> Condition {
        self.comparison(ComparisonOperator::IsNotNull, vec![])
    }
}
