#![warn(missing_docs)]

//! Joins.
//!
//! Grounded on `original_source/sqldatabase/sqljoin.py`'s `SqlJoin`/
//! `ESqlJoinType`.

use std::rc::Rc;

use crate::error::{BuildError, SchemaError};
use crate::schema::Table;

use super::condition::{ComparisonOperator, Condition, Operand, RightHandValue};

/// The SQL join kinds this crate supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    /// `CROSS JOIN`
    Cross,
    /// `FULL JOIN`
    Full,
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
}

impl JoinType {
    /// The join's rendered SQL token, e.g. `"INNER"`.
    pub fn token(&self) -> &'static str {
        match self {
            JoinType::Cross => "CROSS",
            JoinType::Full => "FULL",
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        }
    }
}

impl Default for JoinType {
    fn default() -> Self {
        JoinType::Inner
    }
}

/// A target table, a join type, and the condition linking it to the query.
pub struct Join {
    /// The table being joined in.
    pub table: Rc<Table>,
    /// The kind of join.
    pub join_type: JoinType,
    /// The join condition.
    pub condition: Condition,
}

impl Join {
    /// Builds a join over explicit columns: `columns[0] op columns[1..]`,
    /// matching `SqlJoin(table, *columns, type_=INNER, operator=IS_EQUAL)`.
    pub fn new(
        table: Rc<Table>,
        columns: Vec<Operand>,
        join_type: JoinType,
        operator: ComparisonOperator,
    ) -> Result<Self, BuildError> {
        let mut columns = columns.into_iter();
        let left = columns.next().ok_or(BuildError::ValueCountMismatch {
            operator: operator.token().to_string(),
            expected: ">=1".to_string(),
            actual: 0,
        })?;
        let right_values: Vec<RightHandValue> = columns
            .map(|operand| match operand {
                Operand::Column(c) => RightHandValue::Column(c),
                Operand::Function(f) => RightHandValue::Function(f),
            })
            .collect();
        let condition = Condition::new(left, operator, right_values)?;
        Ok(Join { table, join_type, condition })
    }

    /// Builds a join by automatically locating a foreign-key column between
    /// `base` and `table`, searching `table → base` first, then
    /// `base → table`.
    pub fn infer(base: &Table, table: Rc<Table>, join_type: JoinType) -> Result<Self, SchemaError> {
        let (left, right) = base.join_column(&table).ok_or_else(|| SchemaError::NoForeignKey {
            left: base.name.clone(),
            right: table.name.clone(),
        })?;
        let condition = Condition::build_unchecked(
            Operand::Column(left),
            ComparisonOperator::Equal,
            vec![RightHandValue::Column(right)],
        );
        Ok(Join { table, join_type, condition })
    }

    /// Renders `<TYPE> JOIN <fqn> ON <condition>`.
    pub fn to_sql(&self) -> String {
        format!(
            "{} JOIN {} ON {}",
            self.join_type.token(),
            self.table.fully_qualified_name(),
            self.condition.to_sql()
        )
    }
}
