#![warn(missing_docs)]

//! Comparison and compound conditions.
//!
//! Grounded on `original_source/sqldatabase/sqlcondition.py`'s
//! `SqlCondition(left, operator, *right)` shape (the Open Question
//! resolution recorded in `DESIGN.md`) and `sqloperator.py`'s operator
//! token table, corrected here: `IS_GREATER_THAN_OR_EQUAL` renders `>=`,
//! not the `<=` duplicate present in every retrieved copy of the original.
//!
//! A closed, tagged two-variant type stands in for the original's
//! `SqlCondition`/`SqlCompoundCondition` subclass pair, per the "polymorphism
//! over a closed set" design note.

use std::rc::Rc;

use crate::error::BuildError;
use crate::schema::Column;
use crate::value::Value;

use super::function::AggregateFunction;

/// A comparison operator and its SQL token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `BETWEEN`
    Between,
    /// `NOT BETWEEN`
    NotBetween,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

/// How many right-hand values an operator accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arity {
    Zero,
    One,
    Two,
    AtLeastOne,
}

impl ComparisonOperator {
    /// The operator's rendered SQL token.
    pub fn token(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::NotLike => "NOT LIKE",
            ComparisonOperator::In => "IN",
            ComparisonOperator::NotIn => "NOT IN",
            ComparisonOperator::Between => "BETWEEN",
            ComparisonOperator::NotBetween => "NOT BETWEEN",
            ComparisonOperator::IsNull => "IS NULL",
            ComparisonOperator::IsNotNull => "IS NOT NULL",
        }
    }

    fn arity(&self) -> Arity {
        match self {
            ComparisonOperator::IsNull | ComparisonOperator::IsNotNull => Arity::Zero,
            ComparisonOperator::Between | ComparisonOperator::NotBetween => Arity::Two,
            ComparisonOperator::In | ComparisonOperator::NotIn => Arity::AtLeastOne,
            _ => Arity::One,
        }
    }

    fn validate(&self, count: usize) -> Result<(), BuildError> {
        let ok = match self.arity() {
            Arity::Zero => count == 0,
            Arity::One => count == 1,
            Arity::Two => count == 2,
            Arity::AtLeastOne => count >= 1,
        };
        if ok {
            Ok(())
        } else {
            Err(BuildError::ValueCountMismatch {
                operator: self.token().to_string(),
                expected: match self.arity() {
                    Arity::Zero => "0".to_string(),
                    Arity::One => "1".to_string(),
                    Arity::Two => "2".to_string(),
                    Arity::AtLeastOne => ">=1".to_string(),
                },
                actual: count,
            })
        }
    }
}

/// `AND` / `OR`, joining two conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl LogicalOperator {
    /// The operator's rendered SQL token.
    pub fn token(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// The left-hand side of a comparison: anything with a fully qualified SQL
/// form and a value-conversion pipeline.
#[derive(Clone)]
pub enum Operand {
    /// A column.
    Column(Rc<Column>),
    /// An aggregate function.
    Function(Rc<AggregateFunction>),
}

impl Operand {
    fn to_sql(&self) -> String {
        match self {
            Operand::Column(c) => c.fully_qualified_name(),
            Operand::Function(f) => f.to_sql(),
        }
    }

    fn generate_parameter_name(&self) -> String {
        match self {
            Operand::Column(c) => c.generate_parameter_name(),
            Operand::Function(f) => f.generate_parameter_name(),
        }
    }

    fn to_database_value(&self, value: &Value) -> Value {
        match self {
            Operand::Column(c) => c.to_database_value(value),
            Operand::Function(f) => f.to_database_value(value),
        }
    }
}

/// A rendered sub-select, usable as a right-hand comparison value. Produced
/// by a `Select` statement's `as_subselect()`.
#[derive(Clone, Debug, PartialEq)]
pub struct SubselectOperand {
    /// The sub-select's canonical SQL, unparenthesized.
    pub sql: String,
    /// The sub-select's accumulated named parameters.
    pub parameters: Vec<(String, Value)>,
}

/// A right-hand comparison value: another column, an aggregate function, a
/// sub-select, or a plain literal.
#[derive(Clone)]
pub enum RightHandValue {
    /// Another column, rendered by fully qualified name.
    Column(Rc<Column>),
    /// An aggregate function, rendered by its SQL form.
    Function(Rc<AggregateFunction>),
    /// A sub-select, rendered parenthesized; its parameters are merged in.
    Subselect(SubselectOperand),
    /// A literal value, bound to a freshly generated parameter name.
    Literal(Value),
}

impl<T: Into<Value>> From<T> for RightHandValue {
    fn from(value: T) -> Self {
        RightHandValue::Literal(value.into())
    }
}

/// A tree of comparison and compound conditions, each carrying its own
/// accumulated named-parameter map.
#[derive(Clone)]
pub enum Condition {
    /// A leaf comparison: `left op values...`.
    Comparison {
        /// The left-hand operand.
        left: Operand,
        /// The comparison operator.
        operator: ComparisonOperator,
        /// The right-hand values' rendered SQL text, in order.
        rendered_values: Vec<String>,
        /// The accumulated named parameters for this node.
        parameters: Vec<(String, Value)>,
    },
    /// A compound `left AND right` / `left OR right`.
    Compound {
        /// The left-hand sub-condition.
        left: Box<Condition>,
        /// The logical operator joining the two sides.
        operator: LogicalOperator,
        /// The right-hand sub-condition.
        right: Box<Condition>,
        /// The union of both sides' named parameters.
        parameters: Vec<(String, Value)>,
    },
}

impl Condition {
    /// Builds a validated comparison condition.
    ///
    /// Each value is classified by kind: a column renders its fully
    /// qualified name, a function its SQL form, a sub-select
    /// `(sub-sql)` with its parameters merged in, and a literal is bound to
    /// a freshly generated parameter name derived from `left`.
    pub fn new(
        left: Operand,
        operator: ComparisonOperator,
        values: Vec<RightHandValue>,
    ) -> Result<Self, BuildError> {
        operator.validate(values.len())?;
        Ok(Self::build_unchecked(left, operator, values))
    }

    pub(crate) fn build_unchecked(
        left: Operand,
        operator: ComparisonOperator,
        values: Vec<RightHandValue>,
    ) -> Self {
        let mut parameters = Vec::new();
        let rendered_values = values
            .into_iter()
            .map(|value| match value {
                RightHandValue::Column(c) => c.fully_qualified_name(),
                RightHandValue::Function(f) => f.to_sql(),
                RightHandValue::Subselect(sub) => {
                    parameters.extend(sub.parameters);
                    format!("({})", sub.sql)
                }
                RightHandValue::Literal(v) => {
                    let name = left.generate_parameter_name();
                    let converted = left.to_database_value(&v);
                    parameters.push((name.clone(), converted));
                    format!(":{name}")
                }
            })
            .collect();
        Condition::Comparison {
            left,
            operator,
            rendered_values,
            parameters,
        }
    }

    /// Combines `self` and `other` with `AND`.
    pub fn and(self, other: Condition) -> Condition {
        self.compound(LogicalOperator::And, other)
    }

    /// Combines `self` and `other` with `OR`.
    pub fn or(self, other: Condition) -> Condition {
        self.compound(LogicalOperator::Or, other)
    }

    fn compound(self, operator: LogicalOperator, other: Condition) -> Condition {
        let mut parameters = self.parameters().to_vec();
        parameters.extend(other.parameters().iter().cloned());
        Condition::Compound {
            left: Box::new(self),
            operator,
            right: Box::new(other),
            parameters,
        }
    }

    /// This node's accumulated named parameters (its own, for a leaf; the
    /// union of both sides, for a compound).
    pub fn parameters(&self) -> &[(String, Value)] {
        match self {
            Condition::Comparison { parameters, .. } => parameters,
            Condition::Compound { parameters, .. } => parameters,
        }
    }

    /// Renders this condition's SQL text.
    pub fn to_sql(&self) -> String {
        match self {
            Condition::Comparison {
                left,
                operator,
                rendered_values,
                ..
            } => match operator.arity() {
                Arity::Zero => format!("{} {}", left.to_sql(), operator.token()),
                Arity::Two => format!(
                    "{} {} {} AND {}",
                    left.to_sql(),
                    operator.token(),
                    rendered_values[0],
                    rendered_values[1]
                ),
                Arity::AtLeastOne => format!(
                    "{} {} ({})",
                    left.to_sql(),
                    operator.token(),
                    rendered_values.join(", ")
                ),
                Arity::One => format!("{} {} {}", left.to_sql(), operator.token(), rendered_values[0]),
            },
            Condition::Compound {
                left,
                operator,
                right,
                ..
            } => format!("({} {} {})", left.to_sql(), operator.token(), right.to_sql()),
        }
    }
}

impl std::ops::BitAnd for Condition {
    type Output = Condition;
    fn bitand(self, rhs: Condition) -> Condition {
        self.and(rhs)
    }
}

impl std::ops::BitOr for Condition {
    type Output = Condition;
    fn bitor(self, rhs: Condition) -> Condition {
        self.or(rhs)
    }
}
