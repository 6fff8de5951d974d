#![warn(missing_docs)]

//! `CREATE TABLE`.

use std::rc::Rc;

use crate::schema::Table;
use crate::transpiler::ESqlDialect;

/// A `CREATE TABLE` statement: column definitions in declaration order,
/// followed by a `PRIMARY KEY` constraint and one `FOREIGN KEY` constraint
/// per referencing column. Carries no parameters.
pub struct CreateTable {
    /// The table being created.
    pub table: Rc<Table>,
    /// Whether to emit `IF NOT EXISTS`.
    pub if_not_exists: bool,
}

impl CreateTable {
    /// Builds a `CREATE TABLE` for `table`.
    pub fn new(table: Rc<Table>) -> Self {
        CreateTable { table, if_not_exists: false }
    }

    /// Emits `IF NOT EXISTS`.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Renders this statement's SQL for `dialect`. Column type spellings
    /// come straight from [`crate::datatype::DataType::to_sql`]; there is
    /// no further transpilation phase to run.
    pub fn sql(&self, dialect: ESqlDialect) -> String {
        let mut column_defs: Vec<String> = self
            .table
            .columns()
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.data_type.to_sql(dialect));
                if column.not_null {
                    def.push_str(" NOT NULL");
                }
                if column.unique {
                    def.push_str(" UNIQUE");
                }
                if column.autoincrement {
                    def.push_str(" AUTOINCREMENT");
                }
                if let Some(default_sql) = column.default_to_sql() {
                    def.push_str(&format!(" DEFAULT {default_sql}"));
                }
                def
            })
            .collect();

        if let Some(pk) = self.table.primary_key_column() {
            column_defs.push(format!("PRIMARY KEY({})", pk.name));
        }
        for fk in self.table.foreign_key_columns() {
            if let Some(target) = fk.reference() {
                if let Some(target_table) = target.table() {
                    column_defs.push(format!(
                        "FOREIGN KEY({}) REFERENCES {}({})",
                        fk.name,
                        target_table.fully_qualified_name(),
                        target.name
                    ));
                }
            }
        }

        let if_not_exists = if self.if_not_exists { "IF NOT EXISTS " } else { "" };
        format!(
            "CREATE TABLE {if_not_exists}{} ({})",
            self.table.fully_qualified_name(),
            column_defs.join(", ")
        )
    }
}
