//! Integration-style tests exercising the full statement-build + transpile
//! + execute-against-the-in-memory-`Connection` round trip, as distinct
//! from the unit tests living alongside each module.
//!
//! Grounded on Lume's own `src/tests/database.rs`/`src/tests/query.rs`
//! split (schema/CRUD plumbing vs. query composition), rebuilt here against
//! this crate's `DatabaseBuilder`/`Select`/`Record` API rather than Lume's
//! macro-registered schema.
