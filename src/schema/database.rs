#![warn(missing_docs)]

//! Database construction and schema binding.
//!
//! [`DatabaseBuilder::build`] performs the three-step binding algorithm:
//! set each table's database back-reference, set each column's table
//! back-reference and bind its data type (deduplicating non-parameterized
//! types by name), then repair foreign-key reverse edges.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::column::{Column, ColumnDef};
use super::table::{Table, TableDef};
use crate::connection::{Connection, Cursor};
use crate::datatype::DataType;
use crate::error::{ExecutionError, SchemaError, TransqlError};
use crate::expr::filter::ColumnFilters;
use crate::record::Record;
use crate::statement::{CreateTable, Delete, DropTable, InsertInto, Select, Update};
use crate::transpiler::ESqlDialect;

/// Builds a [`Database`] from [`TableDef`] declarations.
#[derive(Default)]
pub struct DatabaseBuilder {
    name: String,
    dialect: ESqlDialect,
    tables: Vec<TableDef>,
    connection: Option<Box<dyn Connection>>,
}

impl DatabaseBuilder {
    /// Starts a new builder for a database named `name`, targeting `dialect`.
    pub fn new(name: impl Into<String>, dialect: ESqlDialect) -> Self {
        DatabaseBuilder {
            name: name.into(),
            dialect,
            tables: Vec::new(),
            connection: None,
        }
    }

    /// Registers a table declaration.
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    /// Attaches a backend connection at construction time. Equivalent to
    /// calling [`Database::set_connection`] right after `build()`.
    pub fn connection(mut self, connection: impl Connection + 'static) -> Self {
        self.connection = Some(Box::new(connection));
        self
    }

    /// Validates and binds every declared table/column, producing a live
    /// [`Database`].
    ///
    /// # Failure
    ///
    /// Fails with [`SchemaError::MissingDeclaration`] if no tables were
    /// declared, or [`SchemaError::UnknownDataType`] if a foreign key
    /// references a table or column that was never declared (the schema
    /// equivalent of an unknown data type name: the target simply isn't in
    /// this builder's universe).
    pub fn build(self) -> Result<Rc<Database>, SchemaError> {
        if self.tables.is_empty() {
            return Err(SchemaError::MissingDeclaration {
                what: "tables".to_string(),
            });
        }
        for table in &self.tables {
            if table.columns.is_empty() {
                return Err(SchemaError::MissingDeclaration {
                    what: format!("columns ({})", table.name),
                });
            }
            for column in &table.columns {
                if let Some((ref_table, ref_column)) = &column.reference {
                    let target_table = self
                        .tables
                        .iter()
                        .find(|t| &t.name == ref_table)
                        .ok_or_else(|| SchemaError::NoForeignKey {
                            left: table.name.clone(),
                            right: ref_table.clone(),
                        })?;
                    if !target_table.columns.iter().any(|c| &c.name == ref_column) {
                        return Err(SchemaError::NoForeignKey {
                            left: format!("{}.{}", table.name, column.name),
                            right: format!("{ref_table}.{ref_column}"),
                        });
                    }
                }
            }
        }

        let name = self.name;
        let dialect = self.dialect;
        let table_defs = self.tables;
        let connection = self.connection;
        let mut type_registry: HashMap<String, Rc<DataType>> = HashMap::new();

        let database = Rc::new_cyclic(|db_weak: &Weak<Database>| {
            let tables: Vec<Rc<Table>> = table_defs
                .iter()
                .map(|tdef| {
                    Rc::new_cyclic(|table_weak: &Weak<Table>| {
                        let columns: Vec<Rc<Column>> = tdef
                            .columns
                            .iter()
                            .map(|cdef| {
                                tracing::debug!(table = %tdef.name, column = %cdef.name, "binding column");
                                let data_type = bind_data_type(&mut type_registry, &cdef.data_type);
                                Rc::new(Column {
                                    name: cdef.name.clone(),
                                    data_type,
                                    primary_key: cdef.primary_key,
                                    autoincrement: cdef.autoincrement,
                                    not_null: cdef.not_null,
                                    unique: cdef.unique,
                                    default: cdef.default.clone(),
                                    values: cdef.values.clone(),
                                    adapter: cdef.adapter,
                                    converter: cdef.converter,
                                    reference: RefCell::new(None),
                                    foreign_keys: RefCell::new(Vec::new()),
                                    table: RefCell::new(table_weak.clone()),
                                    filters: ColumnFilters::new(),
                                })
                            })
                            .collect();
                        tracing::debug!(table = %tdef.name, columns = columns.len(), "bound table");
                        Table {
                            name: tdef.name.clone(),
                            schema: tdef.schema.clone(),
                            columns,
                            database: RefCell::new(db_weak.clone()),
                            self_ref: RefCell::new(table_weak.clone()),
                        }
                    })
                })
                .collect();
            tracing::debug!(database = %name, tables = tables.len(), "bound database");
            Database {
                name,
                dialect,
                tables,
                connection: RefCell::new(connection),
                attached: RefCell::new(HashMap::new()),
            }
        });

        // Wire each column's `filters` factory to point back at the bound
        // column (ColumnFilters is constructed before the Rc<Column> exists,
        // so it is completed here by weak self-reference).
        for table in &database.tables {
            for column in &table.columns {
                column.filters.bind(Rc::downgrade(column));
            }
        }

        // Repair foreign-key reverse edges: for every column declaring a
        // reference, resolve the live target column and register the
        // forward edge plus the target's reverse `foreign_keys` entry.
        for (table, tdef) in database.tables.iter().zip(table_defs.iter()) {
            for (column, cdef) in table.columns.iter().zip(tdef.columns.iter()) {
                if let Some((ref_table, ref_column)) = &cdef.reference {
                    let target = database
                        .tables
                        .iter()
                        .find(|t| &t.name == ref_table)
                        .and_then(|t| t.column(ref_column))
                        .expect("validated above");
                    *column.reference.borrow_mut() = Some(Rc::downgrade(&target));
                    target.foreign_keys.borrow_mut().push(Rc::downgrade(column));
                }
            }
        }

        Ok(database)
    }
}

/// A row's alias could not be resolved against the live schema while
/// decoding a cursor result into a [`Record`].
#[derive(Debug)]
struct AliasResolutionError(String);

impl std::fmt::Display for AliasResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AliasResolutionError {}

impl From<AliasResolutionError> for ExecutionError {
    fn from(value: AliasResolutionError) -> Self {
        ExecutionError(Box::new(value))
    }
}

impl From<AliasResolutionError> for TransqlError {
    fn from(value: AliasResolutionError) -> Self {
        TransqlError::Execution(ExecutionError::from(value))
    }
}

fn bind_data_type(registry: &mut HashMap<String, Rc<DataType>>, data_type: &DataType) -> Rc<DataType> {
    if data_type.parameter.is_some() {
        return Rc::new(*data_type);
    }
    registry
        .entry(data_type.name.to_string())
        .or_insert_with(|| Rc::new(*data_type))
        .clone()
}

/// A bound database: a named collection of tables targeting one dialect,
/// an optional backend connection, and a map of attached sibling databases
/// for cross-database joins.
pub struct Database {
    /// The database's name.
    pub name: String,
    /// The dialect this database's statements are authored against.
    pub dialect: ESqlDialect,
    pub(crate) tables: Vec<Rc<Table>>,
    connection: RefCell<Option<Box<dyn Connection>>>,
    attached: RefCell<HashMap<String, Rc<Database>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("dialect", &self.dialect.as_str())
            .field("tables", &self.tables.iter().map(|t| &t.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Database {
    /// This database's tables, in declaration order.
    pub fn tables(&self) -> &[Rc<Table>] {
        &self.tables
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<Rc<Table>> {
        self.tables.iter().find(|t| t.name == name).cloned()
    }

    /// Tables in an order safe for sequential `CREATE TABLE` (referenced
    /// tables first) or, reversed, for sequential `DROP TABLE`.
    pub fn tables_in_dependency_order(&self) -> Vec<Rc<Table>> {
        let mut ordered: Vec<Rc<Table>> = Vec::new();
        let mut visit = |table: &Rc<Table>, ordered: &mut Vec<Rc<Table>>| {
            fn visit_rec(table: &Rc<Table>, ordered: &mut Vec<Rc<Table>>) {
                if ordered.iter().any(|t| Rc::ptr_eq(t, table)) {
                    return;
                }
                for referenced in table.referenced_tables() {
                    visit_rec(&referenced, ordered);
                }
                ordered.push(Rc::clone(table));
            }
            visit_rec(table, ordered);
        };
        for table in &self.tables {
            visit(table, &mut ordered);
        }
        ordered
    }

    /// Attaches another database as a sibling, reachable from alias
    /// resolution and cross-database joins. Replaces any previously
    /// attached database of the same name.
    pub fn attach(&self, database: Rc<Database>) {
        self.attached.borrow_mut().insert(database.name.clone(), database);
    }

    /// The databases currently attached to this one.
    pub fn attached_databases(&self) -> Vec<Rc<Database>> {
        self.attached.borrow().values().cloned().collect()
    }

    /// Attaches (or replaces) this database's backend connection.
    pub fn set_connection(&self, connection: impl Connection + 'static) {
        *self.connection.borrow_mut() = Some(Box::new(connection));
    }

    /// Executes `sql` with `params` against the attached connection.
    ///
    /// # Failure
    ///
    /// Fails if no connection has been attached, or if the connection
    /// itself reports an [`ExecutionError`].
    pub fn execute(&self, sql: &str, params: &crate::transpiler::Parameters) -> Result<Box<dyn Cursor>, ExecutionError> {
        let mut connection = self.connection.borrow_mut();
        let connection = connection.as_mut().ok_or(crate::connection::NoConnection)?;
        connection.execute(sql, params)
    }

    /// Commits the attached connection's current transaction.
    pub fn commit(&self) -> Result<(), ExecutionError> {
        let mut connection = self.connection.borrow_mut();
        let connection = connection.as_mut().ok_or(crate::connection::NoConnection)?;
        connection.commit()
    }

    /// Rolls back the attached connection's current transaction.
    pub fn rollback(&self) -> Result<(), ExecutionError> {
        let mut connection = self.connection.borrow_mut();
        let connection = connection.as_mut().ok_or(crate::connection::NoConnection)?;
        connection.rollback()
    }

    /// Closes the attached connection.
    pub fn close(&self) -> Result<(), ExecutionError> {
        let mut connection = self.connection.borrow_mut();
        let connection = connection.as_mut().ok_or(crate::connection::NoConnection)?;
        connection.close()
    }

    /// Whether the attached connection commits each statement on its own.
    /// No connection attached counts as `false`.
    fn autocommits(&self) -> bool {
        self.connection.borrow().as_ref().map(|c| c.autocommit()).unwrap_or(false)
    }

    fn commit_unless_autocommit(&self) -> Result<(), ExecutionError> {
        if !self.autocommits() {
            self.commit()?;
        }
        Ok(())
    }

    /// Renders and executes a `CREATE TABLE` for `table` against this
    /// database's dialect and connection.
    pub fn create_table(&self, table: &Rc<Table>, if_not_exists: bool) -> Result<(), TransqlError> {
        let mut statement = CreateTable::new(table.clone());
        if if_not_exists {
            statement = statement.if_not_exists();
        }
        let sql = statement.sql(self.dialect);
        self.execute(&sql, &crate::transpiler::Parameters::Named(Vec::new()))?;
        self.commit_unless_autocommit()?;
        Ok(())
    }

    /// Renders and executes a `DROP TABLE` for `table`.
    pub fn drop_table(&self, table: &Rc<Table>, if_exists: bool) -> Result<(), TransqlError> {
        let mut statement = DropTable::new(table.clone());
        if if_exists {
            statement = statement.if_exists();
        }
        let sql = statement.sql();
        self.execute(&sql, &crate::transpiler::Parameters::Named(Vec::new()))?;
        self.commit_unless_autocommit()?;
        Ok(())
    }

    /// Inserts `record` into `table`, returning the new row's primary key
    /// if the cursor reported one (via `RETURNING` or the driver's own
    /// `last_row_id`).
    pub fn insert_record(&self, table: &Rc<Table>, record: Record) -> Result<Option<i64>, TransqlError> {
        let statement = InsertInto::new(table.clone(), record);
        let (sql, params) = statement.render(self.dialect)?;
        let mut cursor = self.execute(&sql, &params)?;
        let row_id = cursor.next_row().and_then(|row| row.into_iter().next()).and_then(|v| i64::try_from(v).ok());
        let row_id = row_id.or_else(|| cursor.last_row_id());
        self.commit_unless_autocommit()?;
        Ok(row_id)
    }

    /// Executes `select` and decodes every returned row into a [`Record`]
    /// keyed by the columns/functions it projected.
    pub fn select_records(&self, select: &Select) -> Result<Vec<Record>, TransqlError> {
        let (sql, params) = select.render(self.dialect)?;
        let mut cursor = self.execute(&sql, &params)?;
        let aliases = cursor.column_aliases().map(|a| a.to_vec()).unwrap_or_else(|| select.aliases());
        let mut records = Vec::new();
        while let Some(row) = cursor.next_row() {
            let record = Record::from_row(self, &aliases, row).map_err(AliasResolutionError)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Executes `update`, returning how many rows it reported via
    /// `RETURNING`.
    pub fn update_records(&self, update: &Update) -> Result<u64, TransqlError> {
        let (sql, params) = update.render(self.dialect)?;
        let mut cursor = self.execute(&sql, &params)?;
        let mut count = 0u64;
        while cursor.next_row().is_some() {
            count += 1;
        }
        self.commit_unless_autocommit()?;
        Ok(count)
    }

    /// Executes `delete`, returning how many rows it reported via
    /// `RETURNING`.
    pub fn delete_records(&self, delete: &Delete) -> Result<u64, TransqlError> {
        let (sql, params) = delete.render(self.dialect)?;
        let mut cursor = self.execute(&sql, &params)?;
        let mut count = 0u64;
        while cursor.next_row().is_some() {
            count += 1;
        }
        self.commit_unless_autocommit()?;
        Ok(count)
    }
}
