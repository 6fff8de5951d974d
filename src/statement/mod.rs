#![warn(missing_docs)]

//! Statement builders.
//!
//! Every variant renders a canonical SQLite-dialect template plus a named
//! template parameter map at construction time, then derives two things
//! lazily, once a target dialect is known: `sql`, the template rewritten by
//! the [`crate::transpiler::Transpiler`], and `parameters`, the template
//! map reshaped to match. `CreateTable`/`DropTable` have no placeholders or
//! `RETURNING` clause to rewrite, so they render their dialect-specific
//! column type spellings directly (via `DataType::to_sql`) rather than
//! round-tripping through the transpiler; see `DESIGN.md`.
//!
//! Grounded on the query builder's imperative `helpers::get_starting_sql`/
//! `build_filter_expr`/`returning_sql` string-building style rather than a
//! template-engine approach: SQL is assembled with plain `format!` and
//! `String` concatenation throughout.

pub mod create_table;
pub mod delete;
pub mod drop_table;
pub mod insert;
pub mod select;
pub mod update;

pub use create_table::CreateTable;
pub use delete::Delete;
pub use drop_table::DropTable;
pub use insert::InsertInto;
pub use select::{OrderByArg, OrderDirection, Select};
pub use update::Update;

use crate::error::TransqlError;
use crate::transpiler::{ESqlDialect, Parameters, Transpiler};

/// Rewrites a canonical-dialect `template`/`parameters` pair into
/// `dialect`, shared by every statement variant that carries placeholders
/// or a `RETURNING` clause.
pub(crate) fn transpile(
    template: &str,
    parameters: Parameters,
    dialect: ESqlDialect,
) -> Result<(String, Parameters), TransqlError> {
    Transpiler::new(dialect).transpile(template, parameters, None)
}
