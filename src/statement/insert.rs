#![warn(missing_docs)]

//! `INSERT INTO`.

use std::rc::Rc;

use crate::error::TransqlError;
use crate::record::{Record, RecordKey};
use crate::schema::Table;
use crate::transpiler::{ESqlDialect, Parameters};
use crate::value::Value;

/// An `INSERT INTO` statement built from a [`Record`].
///
/// Generates one fresh bind parameter name per record entry at
/// construction time and keeps it fixed across renders: for a bulk insert
/// the caller reuses the same statement and rebinds parameter values in
/// order, so the placeholder names must stay stable while only the bound
/// values change. Use [`InsertInto::rebind`] for each subsequent row of a
/// bulk insert.
pub struct InsertInto {
    table: Rc<Table>,
    columns: Vec<RecordKey>,
    param_names: Vec<String>,
    raw_values: Vec<Value>,
}

impl InsertInto {
    /// Builds an insert of `record` into `table`.
    pub fn new(table: Rc<Table>, record: Record) -> Self {
        let columns: Vec<RecordKey> = record.iter().map(|(k, _)| k.clone()).collect();
        let param_names: Vec<String> = columns.iter().map(|k| k.generate_parameter_name()).collect();
        let raw_values: Vec<Value> = record.iter().map(|(_, v)| v.clone()).collect();
        InsertInto { table, columns, param_names, raw_values }
    }

    /// Rebinds this statement's values for another row of a bulk insert,
    /// keeping the same placeholder names and column order. `values` must
    /// have the same length as the record this statement was built from.
    pub fn rebind(&mut self, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.raw_values.len());
        self.raw_values = values;
    }

    /// Renders the canonical (SQLite-dialect) template and its named
    /// parameter map.
    pub fn template(&self) -> (String, Vec<(String, Value)>) {
        let mut parameters = Vec::with_capacity(self.columns.len());
        let mut column_names = Vec::with_capacity(self.columns.len());
        let mut placeholders = Vec::with_capacity(self.columns.len());
        for ((key, name), value) in self.columns.iter().zip(&self.param_names).zip(&self.raw_values) {
            if let Some(column_name) = key.column_name() {
                column_names.push(column_name.to_string());
                placeholders.push(format!(":{name}"));
                parameters.push((name.clone(), key.to_database_value(value)));
            }
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.fully_qualified_name(),
            column_names.join(", "),
            placeholders.join(", ")
        );
        if let Some(pk) = self.table.primary_key_column() {
            sql.push_str(&format!(" RETURNING {}", pk.name));
        }
        (sql, parameters)
    }

    /// Renders this statement's SQL and parameters for `dialect`.
    pub fn render(&self, dialect: ESqlDialect) -> Result<(String, Parameters), TransqlError> {
        let (template, params) = self.template();
        super::transpile(&template, Parameters::Named(params), dialect)
    }
}
