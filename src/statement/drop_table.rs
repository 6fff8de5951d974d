#![warn(missing_docs)]

//! `DROP TABLE`.

use std::rc::Rc;

use crate::schema::Table;

/// A `DROP TABLE` statement. Carries no parameters and needs no dialect
/// rewriting: `DROP TABLE` syntax is identical across all four targets.
pub struct DropTable {
    /// The table being dropped.
    pub table: Rc<Table>,
    /// Whether to emit `IF EXISTS`.
    pub if_exists: bool,
}

impl DropTable {
    /// Builds a `DROP TABLE` for `table`.
    pub fn new(table: Rc<Table>) -> Self {
        DropTable { table, if_exists: false }
    }

    /// Emits `IF EXISTS`.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Renders this statement's SQL.
    pub fn sql(&self) -> String {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };
        format!("DROP TABLE {if_exists}{}", self.table.fully_qualified_name())
    }
}
