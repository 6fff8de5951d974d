#![warn(missing_docs)]

//! `DELETE FROM`.

use std::rc::Rc;

use crate::error::TransqlError;
use crate::expr::Condition;
use crate::schema::Table;
use crate::transpiler::{ESqlDialect, Parameters};
use crate::value::Value;

/// A `DELETE FROM` statement with an optional `WHERE` condition. An
/// absent condition deletes every row of `table`.
pub struct Delete {
    table: Rc<Table>,
    where_clause: Option<Condition>,
}

impl Delete {
    /// Builds a delete from `table`.
    pub fn new(table: Rc<Table>) -> Self {
        Delete { table, where_clause: None }
    }

    /// Sets the `WHERE` condition.
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Renders the canonical (SQLite-dialect) template and its named
    /// parameter map.
    pub fn template(&self) -> (String, Vec<(String, Value)>) {
        let mut sql = format!("DELETE FROM {}", self.table.fully_qualified_name());
        let mut parameters = Vec::new();
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
