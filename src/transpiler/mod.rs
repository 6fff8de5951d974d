#![warn(missing_docs)]

//! The dialect-to-dialect SQL and parameter transpiler.
//!
//! Canonical statement templates are authored in SQLite SQL with named
//! `:param` placeholders. [`Transpiler::transpile`] rewrites that template
//! into one of four target dialects and reshapes the caller's parameters to
//! match the target's placeholder convention, following the five phases
//! described for this component: parse, rewrite, emit, textual fix-up,
//! parameter reshaping.
//!
//! Grounded on `original_source/sqldatabase/sqltranspiler.py`, which builds
//! on Python's `sqlglot`. The nearest equivalent in this crate's dependency
//! stack is `sqlparser` (already used elsewhere in the retrieved example
//! pack); unlike `sqlglot`, `sqlparser`'s printer is not itself
//! dialect-aware, so the SQL Server `OUTPUT` clause and all placeholder
//! reshaping are done as textual fix-ups (phase 4) rather than tree
//! rewrites (phase 2) wherever `sqlparser`'s AST has no dialect-specific
//! representation to rewrite.

mod placeholders;

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::error::{ParseError, TransqlError, TranspileError};
use crate::value::Value;
use placeholders::Kind as PlaceholderKind;

/// The four SQL dialects this crate transpiles between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ESqlDialect {
    /// SQLite, also the canonical template dialect.
    Sqlite,
    /// Microsoft SQL Server (T-SQL).
    SqlServer,
    /// PostgreSQL.
    PostgreSql,
    /// MySQL.
    Mysql,
}

impl ESqlDialect {
    /// The dialect's wire name, matching the original's `ESqlDialect` enum values.
    pub fn as_str(&self) -> &'static str {
        match self {
            ESqlDialect::Sqlite => "sqlite",
            ESqlDialect::SqlServer => "tsql",
            ESqlDialect::PostgreSql => "postgres",
            ESqlDialect::Mysql => "mysql",
        }
    }

    fn sql_dialect(&self) -> Box<dyn Dialect> {
        match self {
            ESqlDialect::Sqlite => Box::new(SQLiteDialect {}),
            ESqlDialect::SqlServer => Box::new(MsSqlDialect {}),
            ESqlDialect::PostgreSql => Box::new(PostgreSqlDialect {}),
            ESqlDialect::Mysql => Box::new(MySqlDialect {}),
        }
    }
}

/// A bound-parameter collection, in either of the two shapes a caller may
/// supply or a target dialect may require.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Parameters {
    /// A named association of placeholder name to value.
    Named(Vec<(String, Value)>),
    /// An ordered sequence of values, bound by position.
    Positional(Vec<Value>),
    /// No parameters at all.
    #[default]
    None,
}

type CacheKey = (String, Option<ESqlDialect>);

static PARSE_CACHE: OnceLock<Mutex<HashMap<CacheKey, Vec<Statement>>>> = OnceLock::new();

/// Transpiles canonical SQLite-dialect statement templates into one of the
/// four supported dialects.
pub struct Transpiler {
    output_dialect: ESqlDialect,
}

impl Transpiler {
    /// Creates a transpiler targeting `output_dialect`.
    pub fn new(output_dialect: ESqlDialect) -> Self {
        Transpiler { output_dialect }
    }

    /// Rewrites `sql` and reshapes `parameters` for this transpiler's
    /// output dialect. `input_dialect` defaults to SQLite (the canonical
    /// template dialect) when `None`.
    pub fn transpile(
        &self,
        sql: &str,
        parameters: Parameters,
        input_dialect: Option<ESqlDialect>,
    ) -> Result<(String, Parameters), TransqlError> {
        let tree_sql = self.render_tree(sql, input_dialect)?;
        let occurrences = placeholders::scan(&tree_sql);
        let resolved = self.resolve_parameters(&occurrences, &parameters)?;
        let final_sql = self.substitute_placeholders(&tree_sql, &occurrences);
        let final_parameters = self.reshape_parameters(&occurrences, resolved);
        tracing::trace!(
            dialect = self.output_dialect.as_str(),
            placeholders = occurrences.len(),
            "transpiled statement"
        );
        Ok((final_sql, final_parameters))
    }

    /// Phases 1–4 minus placeholder substitution: parse, rewrite the tree,
    /// emit, and apply the `OUTPUT`/`RETURNING` textual fix-up.
    fn render_tree(
        &self,
        sql: &str,
        input_dialect: Option<ESqlDialect>,
    ) -> Result<String, TransqlError> {
        let statements = Self::parse(sql, input_dialect)?;
        let mut statements = statements;
        if self.output_dialect == ESqlDialect::Mysql {
            for statement in statements.iter_mut() {
                strip_returning(statement);
            }
        }
        let emitted = statements
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(";\n");
        Ok(self.rewrite_returning_output(&emitted))
    }

    fn parse(sql: &str, input_dialect: Option<ESqlDialect>) -> Result<Vec<Statement>, TransqlError> {
        let key: CacheKey = (sql.to_string(), input_dialect);
        let cache = PARSE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        if let Some(cached) = cache.lock().unwrap().get(&key) {
            tracing::trace!(cache = "hit", "parser cache");
            return Ok(cached.clone());
        }
        tracing::trace!(cache = "miss", "parser cache");
        let dialect = input_dialect.unwrap_or(ESqlDialect::Sqlite).sql_dialect();
        let statements =
            Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| TransqlError::from(ParseError::from(e)))?;
        cache.lock().unwrap().insert(key, statements.clone());
        Ok(statements)
    }

    /// Converts a trailing `RETURNING <cols>` into SQL Server's `OUTPUT`
    /// clause, including the T-SQL `DELETE` reordering rule, when this
    /// transpiler's output dialect is SQL Server. A no-op otherwise (MySQL's
    /// `RETURNING` was already removed at the tree level; SQLite and
    /// PostgreSQL accept `RETURNING` unchanged).
    fn rewrite_returning_output(&self, sql: &str) -> String {
        if self.output_dialect != ESqlDialect::SqlServer {
            return sql.to_string();
        }
        static RETURNING: OnceLock<Regex> = OnceLock::new();
        let re = RETURNING
            .get_or_init(|| Regex::new(r"(?is)\s*RETURNING\s+(?P<cols>[^;]+?)\s*;?\s*$").unwrap());
        let Some(caps) = re.captures(sql) else {
            return sql.to_string();
        };
        let cols = caps.name("cols").unwrap().as_str();
        let base = &sql[..caps.get(0).unwrap().start()];
        let trimmed = base.trim_start();
        let virtual_table = if trimmed[..trimmed.len().min(6)].eq_ignore_ascii_case("delete") {
            "DELETED"
        } else {
            "INSERTED"
        };
        let qualified = cols
            .split(',')
            .map(|c| format!("{virtual_table}.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let output_clause = format!("OUTPUT {qualified}");

        if virtual_table == "DELETED" {
            // Naive placement first (right after DELETE), then apply the
            // documented reordering rule so FROM precedes OUTPUT precedes WHERE.
            let naive = format!("DELETE {output_clause} {}", &base["DELETE".len()..]);
            static REORDER: OnceLock<Regex> = OnceLock::new();
            let reorder = REORDER.get_or_init(|| {
                Regex::new(r"(?is)DELETE\s(?P<output>OUTPUT\b.*?)(?P<from>FROM\b.*?)(?=WHERE\b|$)")
                    .unwrap()
            });
            reorder
                .replace(&naive, |c: &regex::Captures| {
                    format!(
                        "DELETE {}\n{}\n",
                        c.name("from").unwrap().as_str().trim(),
                        c.name("output").unwrap().as_str().trim()
                    )
                })
                .into_owned()
        } else if trimmed[..trimmed.len().min(6)].eq_ignore_ascii_case("update") {
            static WHERE: OnceLock<Regex> = OnceLock::new();
            let where_re = WHERE.get_or_init(|| Regex::new(r"(?i)\bWHERE\b").unwrap());
            if let Some(m) = where_re.find(base) {
                format!("{}{} {}", &base[..m.start()], output_clause, &base[m.start()..])
            } else {
                format!("{base} {output_clause}")
            }
        } else {
            static VALUES: OnceLock<Regex> = OnceLock::new();
            let values_re = VALUES.get_or_init(|| Regex::new(r"(?i)\bVALUES\b").unwrap());
            if let Some(m) = values_re.find(base) {
                format!("{}{} {}", &base[..m.start()], output_clause, &base[m.start()..])
            } else {
                format!("{base} {output_clause}")
            }
        }
    }

    fn resolve_parameters(
        &self,
        occurrences: &[placeholders::Occurrence],
        parameters: &Parameters,
    ) -> Result<Vec<Value>, TransqlError> {
        let mut positional_cursor = 0usize;
        let mut resolved = Vec::with_capacity(occurrences.len());
        for occurrence in occurrences {
            let value = match (&occurrence.kind, parameters) {
                (PlaceholderKind::Named(name), Parameters::Named(map)) => map
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| crate::error::BindError::MissingParameter { name: name.clone() })?,
                (PlaceholderKind::Positional(Some(index)), Parameters::Positional(seq)) => seq
                    .get(index.saturating_sub(1))
                    .cloned()
                    .ok_or_else(|| crate::error::BindError::MissingParameter {
                        name: occurrence.raw.clone(),
                    })?,
                (PlaceholderKind::Positional(None), Parameters::Positional(seq)) => {
                    let value = seq.get(positional_cursor).cloned().ok_or_else(|| {
                        crate::error::BindError::MissingParameter {
                            name: occurrence.raw.clone(),
                        }
                    })?;
                    positional_cursor += 1;
                    value
                }
                (_, Parameters::None) => {
                    return Err(crate::error::BindError::MissingParameter {
                        name: occurrence.raw.clone(),
                    }
                    .into());
                }
                _ => {
                    return Err(crate::error::BindError::MissingParameter {
                        name: occurrence.raw.clone(),
                    }
                    .into());
                }
            };
            resolved.push(value);
        }
        Ok(resolved)
    }

    fn substitute_placeholders(&self, sql: &str, occurrences: &[placeholders::Occurrence]) -> String {
        let mut output = String::with_capacity(sql.len());
        let mut cursor = 0usize;
        for (index, occurrence) in occurrences.iter().enumerate() {
            output.push_str(&sql[cursor..occurrence.start]);
            let replacement = match (self.output_dialect, &occurrence.kind) {
                (ESqlDialect::Sqlite, PlaceholderKind::Named(name)) => format!(":{name}"),
                (ESqlDialect::Sqlite, PlaceholderKind::Positional(_)) => {
                    format!(":parameter_{}", index + 1)
                }
                (ESqlDialect::PostgreSql, _) => format!("${}", index + 1),
                (ESqlDialect::SqlServer, _) | (ESqlDialect::Mysql, _) => "?".to_string(),
            };
            output.push_str(&replacement);
            cursor = occurrence.start + occurrence.raw.len();
        }
        output.push_str(&sql[cursor..]);
        output
    }

    fn reshape_parameters(
        &self,
        occurrences: &[placeholders::Occurrence],
        resolved: Vec<Value>,
    ) -> Parameters {
        match self.output_dialect {
            ESqlDialect::Sqlite => {
                let mut named = Vec::new();
                for (index, (occurrence, value)) in occurrences.iter().zip(resolved).enumerate() {
                    match &occurrence.kind {
                        PlaceholderKind::Named(name) => {
                            if !named.iter().any(|(k, _): &(String, Value)| k == name) {
                                named.push((name.clone(), value));
                            }
                        }
                        PlaceholderKind::Positional(_) => {
                            named.push((format!("parameter_{}", index + 1), value));
                        }
                    }
                }
                Parameters::Named(named)
            }
            _ => Parameters::Positional(resolved),
        }
    }
}

fn strip_returning(statement: &mut Statement) {
    match statement {
        Statement::Insert(insert) => insert.returning = None,
        Statement::Update { returning, .. } => *returning = None,
        Statement::Delete(delete) => delete.returning = None,
        _ => {}
    }
}

/// Rewrites `TranspileError::UnsupportedClause` into a crate-wide error with
/// this transpiler's output dialect attached.
#[allow(dead_code)]
fn unsupported(dialect: ESqlDialect, clause: impl Into<String>) -> TranspileError {
    TranspileError::UnsupportedClause {
        dialect,
        clause: clause.into(),
    }
}
