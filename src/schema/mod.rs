#![warn(missing_docs)]

//! The schema model: typed descriptors bound into a back-referencing graph
//! of columns, tables, and a database.
//!
//! Binding happens once, in [`DatabaseBuilder::build`]: it resolves each
//! column's data type (deduplicating non-parameterized types by name),
//! wires `column → table → database` back-references, and repairs
//! foreign-key reverse edges. Everything downstream (expressions,
//! statements) holds non-owning [`std::rc::Weak`] references into this
//! graph; those references are logically weak and never copied by value.

mod column;
mod database;
mod table;

pub use column::{Column, ColumnDef};
pub use database::{Database, DatabaseBuilder};
pub use table::{Table, TableDef};
