#![warn(missing_docs)]

//! Crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns one of the kinds below,
//! or the umbrella [`TransqlError`] that unions them. Nothing is retried
//! internally and nothing is rolled back automatically; callers decide.

use thiserror::Error;

/// Errors raised while binding a schema (tables, columns, data types) into
/// a [`crate::schema::Database`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A column referenced a data type name that was never registered.
    #[error("unknown data type: {name}")]
    UnknownDataType {
        /// The data type name that could not be resolved.
        name: String,
    },
    /// A table or database was constructed without tables/columns and none
    /// were supplied at construction time.
    #[error("missing declaration: {what}")]
    MissingDeclaration {
        /// What was missing, e.g. `"tables"` or `"columns"`.
        what: String,
    },
    /// A join could not find a foreign-key column linking the two tables.
    #[error("no foreign key between {left} and {right}")]
    NoForeignKey {
        /// The left table's name.
        left: String,
        /// The right table's name.
        right: String,
    },
}

/// Errors raised while building an expression tree or statement.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A comparison operator received the wrong number of values.
    #[error("operator {operator} expects {expected} value(s), got {actual}")]
    ValueCountMismatch {
        /// The operator's SQL token.
        operator: String,
        /// The expected arity, as text (e.g. `"0"`, `"2"`, `">=1"`).
        expected: String,
        /// The number of values actually supplied.
        actual: usize,
    },
    /// An `ORDER BY` entry was neither an item nor an `(item, direction)` pair.
    #[error("invalid ORDER BY item")]
    InvalidOrderByItem,
    /// A sub-select used as a scalar operand projected more than one column.
    #[error("sub-select must project exactly one column, got {actual}")]
    SubselectColumnCountMismatch {
        /// The number of columns the sub-select actually projected.
        actual: usize,
    },
}

/// The transpiler could not parse the canonical SQL template.
#[derive(Debug, Error)]
#[error("failed to parse SQL: {0}")]
pub struct ParseError(#[from] sqlparser::parser::ParserError);

/// A construct has no faithful representation in the target dialect.
#[derive(Debug, Error)]
pub enum TranspileError {
    /// The rewriter cannot express this clause in the target dialect.
    #[error("unsupported clause for dialect {dialect:?}: {clause}")]
    UnsupportedClause {
        /// The output dialect that rejected the clause.
        dialect: crate::transpiler::ESqlDialect,
        /// A human-readable description of the offending clause.
        clause: String,
    },
}

/// A placeholder in the rendered SQL has no corresponding bound value.
#[derive(Debug, Error)]
pub enum BindError {
    /// A named parameter was referenced in SQL but never bound.
    #[error("missing value for parameter: {name}")]
    MissingParameter {
        /// The parameter name that was missing.
        name: String,
    },
}

/// An error surfaced by the caller-supplied backend connection.
#[derive(Debug, Error)]
#[error("execution error: {0}")]
pub struct ExecutionError(pub Box<dyn std::error::Error + Send + Sync>);

/// Union of every error kind this crate can produce.
#[derive(Debug, Error)]
pub enum TransqlError {
    /// See [`SchemaError`].
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// See [`BuildError`].
    #[error(transparent)]
    Build(#[from] BuildError),
    /// See [`ParseError`].
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// See [`TranspileError`].
    #[error(transparent)]
    Transpile(#[from] TranspileError),
    /// See [`BindError`].
    #[error(transparent)]
    Bind(#[from] BindError),
    /// See [`ExecutionError`].
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
