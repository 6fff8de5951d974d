#![warn(missing_docs)]

//! Table declarations and bound tables.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::column::{Column, ColumnDef};
use super::Database;
use crate::error::TransqlError;
use crate::expr::Condition;
use crate::record::Record;
use crate::statement::{Delete, InsertInto, Select, Update};

/// An unbound table declaration: a name, an optional schema qualifier, and
/// its columns in declaration order.
#[derive(Clone, Debug, Default)]
pub struct TableDef {
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Declares a table with the given name and no columns yet.
    pub fn new(name: impl Into<String>) -> Self {
        TableDef {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    /// Sets this table's schema qualifier (used on dialects that support
    /// `schema.table`, e.g. SQL Server).
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends a column declaration, in order.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }
}

/// A table bound to a live database.
pub struct Table {
    /// The table's bare name.
    pub name: String,
    /// The table's schema qualifier, if any.
    pub schema: Option<String>,
    pub(crate) columns: Vec<Rc<Column>>,
    pub(crate) database: RefCell<Weak<Database>>,
    pub(crate) self_ref: RefCell<Weak<Table>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns.iter().map(|c| &c.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Table {
    /// The owning database, if it is still alive.
    pub fn database(&self) -> Option<Rc<Database>> {
        self.database.borrow().upgrade()
    }

    /// A new strong reference to this table, used by the convenience CRUD
    /// methods below to build statements that own their table.
    fn rc(&self) -> Rc<Table> {
        self.self_ref.borrow().upgrade().expect("table always holds its own strong reference")
    }

    /// This table's columns, in declaration order.
    pub fn columns(&self) -> &[Rc<Column>] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<Rc<Column>> {
        self.columns.iter().find(|c| c.name == name).cloned()
    }

    /// The table's primary key column, if one was declared.
    pub fn primary_key_column(&self) -> Option<Rc<Column>> {
        self.columns.iter().find(|c| c.primary_key).cloned()
    }

    /// The table's foreign-key columns (those with a `reference` target),
    /// in declaration order.
    pub fn foreign_key_columns(&self) -> Vec<Rc<Column>> {
        self.columns
            .iter()
            .filter(|c| c.reference().is_some())
            .cloned()
            .collect()
    }

    /// The set of other tables this table's foreign keys point at, useful
    /// for sequencing `CREATE`/`DROP TABLE` statements in dependency order.
    pub fn referenced_tables(&self) -> Vec<Rc<Table>> {
        let mut seen = Vec::new();
        for column in self.foreign_key_columns() {
            if let Some(target) = column.reference().and_then(|r| r.table()) {
                if !seen.iter().any(|t: &Rc<Table>| Rc::ptr_eq(t, &target)) {
                    seen.push(target);
                }
            }
        }
        seen
    }

    /// `database[.schema].table`, the dialect-dependent fully qualified name.
    pub fn fully_qualified_name(&self) -> String {
        let db_name = self.database().map(|d| d.name.clone()).unwrap_or_default();
        match &self.schema {
            Some(schema) => format!("{db_name}.{schema}.{}", self.name),
            None => format!("{db_name}.{}", self.name),
        }
    }

    /// Searches for a foreign-key column linking `self` to `other`, first
    /// looking for `other → self`, then `self → other`.
    pub fn join_column(&self, other: &Table) -> Option<(Rc<Column>, Rc<Column>)> {
        for candidate in other.foreign_key_columns() {
            if let Some(target) = candidate.reference() {
                if let Some(target_table) = target.table() {
                    if target_table.name == self.name {
                        return Some((target, candidate));
                    }
                }
            }
        }
        for candidate in self.foreign_key_columns() {
            if let Some(target) = candidate.reference() {
                if let Some(target_table) = target.table() {
                    if target_table.name == other.name {
                        return Some((candidate, target));
                    }
                }
            }
        }
        None
    }

    /// Starts a `SELECT` over this table. Convenience wrapper; equivalent
    /// to `Select::new(table.rc())`.
    pub fn select(&self) -> Select {
        Select::new(self.rc())
    }

    /// Inserts `record` into this table via its owning database.
    ///
    /// # Failure
    ///
    /// Fails with [`TransqlError::Execution`] if no database/connection is
    /// attached.
    pub fn insert(&self, record: Record) -> Result<Option<i64>, TransqlError> {
        let database = self.database().ok_or(crate::connection::NoConnection)?;
        database.insert_record(&self.rc(), record)
    }

    /// Updates this table's rows matching `where_clause`, setting the
    /// columns in `record`, via its owning database.
    pub fn update(&self, record: Record, where_clause: Condition) -> Result<u64, TransqlError> {
        let database = self.database().ok_or(crate::connection::NoConnection)?;
        let statement = Update::new(self.rc(), record).where_clause(where_clause);
        database.update_records(&statement)
    }

    /// Deletes this table's rows matching `where_clause`, via its owning
    /// database. A `None` condition deletes every row.
    pub fn delete(&self, where_clause: Option<Condition>) -> Result<u64, TransqlError> {
        let database = self.database().ok_or(crate::connection::NoConnection)?;
        let mut statement = Delete::new(self.rc());
        if let Some(condition) = where_clause {
            statement = statement.where_clause(condition);
        }
        database.delete_records(&statement)
    }

    /// Inserts `record` and, if no database is attached yet, builds the
    /// statement without executing it, used by callers that want to
    /// render SQL for a table that is not (yet) wired to a connection.
    pub fn insert_statement(&self, record: Record) -> InsertInto {
        InsertInto::new(self.rc(), record)
    }
}
