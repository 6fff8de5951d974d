#![allow(dead_code)]

//! `transql`: a cross-dialect SQL construction and transpilation engine.
//!
//! An application declares its schema once, builds statements against it
//! with a typed, dialect-agnostic builder API, and renders each one into
//! SQLite, SQL Server, PostgreSQL, or MySQL SQL plus a dialect-correct
//! parameter shape, without hand-authoring SQL text per backend. Opening a
//! socket to any of those four engines is the caller's job: `transql` only
//! needs a [`connection::Connection`] implementation to hand the rendered
//! SQL to.

pub mod connection;
pub mod datatype;
pub mod error;
pub mod expr;
pub mod record;
pub mod schema;
pub mod statement;
pub mod transpiler;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
