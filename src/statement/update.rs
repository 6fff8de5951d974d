#![warn(missing_docs)]

//! `UPDATE`.

use std::rc::Rc;

use crate::error::TransqlError;
use crate::expr::Condition;
use crate::record::{Record, RecordKey};
use crate::schema::Table;
use crate::transpiler::{ESqlDialect, Parameters};
use crate::value::Value;

/// An `UPDATE` statement: a `SET` list built from a [`Record`], plus an
/// optional `WHERE` condition.
///
/// If a `WHERE` condition binds a parameter under the same generated name
/// as one of the `SET` assignments (only possible when the same column
/// appears in both the record and the condition with coincidentally equal
/// generated names, which the UUID-salted generator makes vanishingly
/// unlikely but not impossible), the `WHERE` clause's value wins; it is
/// appended to the parameter list after the `SET` assignments and a
/// dialect's positional reshape resolves repeats by first occurrence, so
/// ordering the `WHERE` entries last is what makes them authoritative.
pub struct Update {
    table: Rc<Table>,
    assignments: Vec<(RecordKey, String, Value)>,
    where_clause: Option<Condition>,
}

impl Update {
    /// Builds an update of `table`, setting every column in `record`.
    pub fn new(table: Rc<Table>, record: Record) -> Self {
        let assignments = record
            .iter()
            .map(|(key, value)| (key.clone(), key.generate_parameter_name(), value.clone()))
            .collect();
        Update { table, assignments, where_clause: None }
    }

    /// Sets the `WHERE` condition.
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Renders the canonical (SQLite-dialect) template and its named
    /// parameter map.
    pub fn template(&self) -> (String, Vec<(String, Value)>) {
        let mut set_clauses = Vec::with_capacity(self.assignments.len());
        let mut parameters = Vec::with_capacity(self.assignments.len());
        for (key, name, value) in &self.assignments {
            if let Some(column_name) = key.column_name() {
                set_clauses.push(format!("{column_name} = :{name}"));
                parameters.push((name.clone(), key.to_database_value(value)));
            }
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table.fully_qualified_name(),
            set_clauses.join(", ")
        );
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.to_sql());
            parameters.extend(where_clause.parameters().iter().cloned());
        }
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
