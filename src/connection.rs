#![warn(missing_docs)]

//! The backend connection contract.
//!
//! This crate does not open sockets, manage pools, or speak any wire
//! protocol: how a socket to PostgreSQL is opened is out of scope.
//! [`Connection`] and [`Cursor`] are the minimal
//! synchronous surface a caller's real backend driver must implement; a
//! reference in-memory implementation for this crate's own tests lives in
//! [`crate::testing`].
//!
//! This is a deliberate narrowing from a `sqlx`-backed, async,
//! feature-gated connection down to a synchronous trait pair: interfaces,
//! not a driver.

use std::fmt;

use crate::error::{ExecutionError, TransqlError};
use crate::transpiler::Parameters;
use crate::value::Value;

/// A backend connection: one open session against a SQLite, SQL Server,
/// PostgreSQL, or MySQL engine, reached via whatever driver the caller
/// chooses to wire up.
pub trait Connection {
    /// Executes dialect-correct `sql` with the already-reshaped `params`,
    /// returning a cursor over the result set (or an empty one, for
    /// statements that produce no rows).
    fn execute(&mut self, sql: &str, params: &Parameters) -> Result<Box<dyn Cursor>, ExecutionError>;

    /// Commits the current transaction.
    fn commit(&mut self) -> Result<(), ExecutionError>;

    /// Rolls back the current transaction.
    fn rollback(&mut self) -> Result<(), ExecutionError>;

    /// Closes the connection. Further calls are implementation-defined.
    fn close(&mut self) -> Result<(), ExecutionError>;

    /// Whether this connection commits each statement automatically.
    /// Autocommit is an opt-in construction flag, not a runtime toggle.
    fn autocommit(&self) -> bool;
}

/// A result cursor: the column aliases a `SELECT`/`INSERT ... RETURNING`
/// projected, plus its rows, read one at a time.
pub trait Cursor {
    /// The projected column aliases, in projection order, or `None` for a
    /// statement that returned no rows at all (e.g. an `INSERT` with no
    /// `RETURNING` on MySQL).
    fn column_aliases(&self) -> Option<&[String]>;

    /// Advances to and returns the next row, or `None` once exhausted.
    fn next_row(&mut self) -> Option<Vec<Value>>;

    /// The row id the backend assigned to the most recently inserted row,
    /// if the driver tracks one independently of `RETURNING`.
    fn last_row_id(&self) -> Option<i64>;
}

/// Raised when a [`crate::schema::Database`] is asked to execute a
/// statement before a [`Connection`] has been attached to it.
#[derive(Debug)]
pub struct NoConnection;

impl fmt::Display for NoConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no connection attached to this database")
    }
}

impl std::error::Error for NoConnection {}

impl From<NoConnection> for ExecutionError {
    fn from(value: NoConnection) -> Self {
        ExecutionError(Box::new(value))
    }
}

impl From<NoConnection> for TransqlError {
    fn from(value: NoConnection) -> Self {
        TransqlError::Execution(ExecutionError::from(value))
    }
}
