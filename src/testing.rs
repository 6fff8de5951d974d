#![warn(missing_docs)]

//! An in-memory reference [`Connection`]/[`Cursor`] pair for this crate's
//! own test suite.
//!
//! This is not a real backend driver: it does not speak SQLite's wire
//! format or link against `libsqlite3`. It is a small interpreter tailored
//! to exactly the SQL text shapes [`crate::statement`]'s builders emit:
//! fully qualified `db.table.column` identifiers, `:name` placeholders,
//! dotted `COLUMN.*`/`FUNCTION.*` aliases, and textual `RETURNING`. A
//! generic SQL engine would need to track `sqlparser`'s AST shapes exactly;
//! this interpreter only needs to track this crate's own, far smaller,
//! output grammar, and is read with a regex/string-splitting approach in
//! the same spirit as [`crate::transpiler`]'s placeholder scanning and
//! `RETURNING`→`OUTPUT` rewriting.
//!
//! Only the `Sqlite` dialect's named-placeholder convention is understood;
//! statements rendered for the other three dialects reshape parameters
//! positionally and are out of scope here (a real integration test targets
//! one of those dialects' wire drivers instead). `GROUP BY` with more than
//! one resulting group, `HAVING` beyond a single aggregate row, sub-select
//! predicates, and `LEFT`/`RIGHT`/`FULL` join semantics (folded down to
//! `INNER`) are likewise not implemented; this module exists to exercise
//! the statement builders and the transpiler end to end, not to be a query
//! engine.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::connection::{Connection, Cursor};
use crate::datatype;
use crate::error::ExecutionError;
use crate::schema::{ColumnDef, Database, DatabaseBuilder, TableDef};
use crate::transpiler::{ESqlDialect, Parameters};
use crate::value::Value;

type Row = HashMap<String, Value>;

#[derive(Debug)]
struct InMemoryError(String);

impl fmt::Display for InMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InMemoryError {}

fn fail(message: impl Into<String>) -> ExecutionError {
    ExecutionError(Box::new(InMemoryError(message.into())))
}

#[derive(Default)]
struct TableData {
    rows: Vec<Row>,
}

/// A reference in-memory connection: a map of table name to rows, with no
/// transaction staging: `commit`/`rollback` are no-ops since every
/// statement applies directly.
pub struct InMemoryConnection {
    tables: RefCell<HashMap<String, TableData>>,
    next_row_id: RefCell<i64>,
    autocommit: bool,
    closed: RefCell<bool>,
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        InMemoryConnection {
            tables: RefCell::new(HashMap::new()),
            next_row_id: RefCell::new(1),
            autocommit: true,
            closed: RefCell::new(false),
        }
    }
}

impl InMemoryConnection {
    /// An empty connection with no rows in any table.
    pub fn new() -> Self {
        InMemoryConnection::default()
    }

    /// Sets whether this connection reports autocommit (default `true`).
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    fn execute_inner(&self, sql: &str, params: &Parameters) -> Result<InMemoryCursor, ExecutionError> {
        if *self.closed.borrow() {
            return Err(fail("connection is closed"));
        }
        let named = match params {
            Parameters::Named(pairs) => pairs.iter().cloned().collect::<HashMap<_, _>>(),
            Parameters::Positional(_) => {
                return Err(fail("InMemoryConnection only understands named (Sqlite-dialect) parameters"));
            }
            Parameters::None => HashMap::new(),
        };
        let sql = normalize_whitespace(sql.trim().trim_end_matches(';').trim());
        tracing::debug!(sql = %sql, "in-memory connection executing");

        if let Some(rest) = sql.strip_prefix("SELECT ") {
            self.execute_select(rest, &named)
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            self.execute_insert(rest, &named)
        } else if let Some(rest) = sql.strip_prefix("UPDATE ") {
            self.execute_update(rest, &named)
        } else if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            self.execute_delete(rest, &named)
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            self.execute_create_table(rest)
        } else if let Some(rest) = sql.strip_prefix("DROP TABLE ") {
            self.execute_drop_table(rest)
        } else {
            Err(fail(format!("unsupported statement: {sql}")))
        }
    }

    fn execute_create_table(&self, rest: &str) -> Result<InMemoryCursor, ExecutionError> {
        let rest = rest.strip_prefix("IF NOT EXISTS ").unwrap_or(rest);
        let table_fqn = rest.split(['(', ' ']).next().unwrap_or("");
        let table = last_segment(table_fqn);
        self.tables.borrow_mut().entry(table).or_default();
        Ok(InMemoryCursor::empty())
    }

    fn execute_drop_table(&self, rest: &str) -> Result<InMemoryCursor, ExecutionError> {
        let rest = rest.strip_prefix("IF EXISTS ").unwrap_or(rest);
        let table = last_segment(rest.trim());
        self.tables.borrow_mut().remove(&table);
        Ok(InMemoryCursor::empty())
    }

    fn execute_insert(&self, rest: &str, params: &HashMap<String, Value>) -> Result<InMemoryCursor, ExecutionError> {
        let open = rest.find('(').ok_or_else(|| fail("malformed INSERT INTO: no column list"))?;
        let table_fqn = rest[..open].trim();
        let table = last_segment(table_fqn);
        let close = find_matching_close(rest, open);
        let columns: Vec<String> = rest[open + 1..close].split(", ").map(|c| c.trim().to_string()).collect();

        let after_cols = rest[close + 1..].trim_start();
        let after_cols = after_cols.strip_prefix("VALUES ").ok_or_else(|| fail("malformed INSERT INTO: no VALUES"))?;
        let values_open = after_cols.find('(').ok_or_else(|| fail("malformed INSERT INTO: no value list"))?;
        let values_close = find_matching_close(after_cols, values_open);
        let raw_values: Vec<&str> = after_cols[values_open + 1..values_close].split(", ").collect();

        let returning_col = after_cols[values_close + 1..]
            .trim()
            .strip_prefix("RETURNING ")
            .map(|s| s.trim().to_string());

        let mut row: Row = HashMap::new();
        for (col, raw) in columns.iter().zip(raw_values.iter()) {
            let value = resolve_scalar(raw.trim(), params);
            row.insert(format!("{table}.{col}"), value);
        }

        let mut returned_row = Vec::new();
        if let Some(ret_col) = &returning_col {
            let key = format!("{table}.{ret_col}");
            if !row.contains_key(&key) || row.get(&key) == Some(&Value::Null) {
                let mut next_id = self.next_row_id.borrow_mut();
                let id = *next_id;
                *next_id += 1;
                row.insert(key.clone(), Value::Int(id));
            }
            returned_row.push(row.get(&key).cloned().unwrap_or(Value::Null));
        }

        self.tables.borrow_mut().entry(table).or_default().rows.push(row);

        let rows = if returned_row.is_empty() { Vec::new() } else { vec![returned_row] };
        let aliases = returning_col.map(|c| vec![c]);
        Ok(InMemoryCursor { aliases, rows, index: 0, last_row_id: None })
    }

    fn execute_update(&self, rest: &str, params: &HashMap<String, Value>) -> Result<InMemoryCursor, ExecutionError> {
        let set_pos = rest.find(" SET ").ok_or_else(|| fail("malformed UPDATE: no SET"))?;
        let table = last_segment(rest[..set_pos].trim());
        let after_set = &rest[set_pos + " SET ".len()..];

        let boundaries = find_clause_boundaries(after_set, &[" WHERE ", " RETURNING "]);
        let assignments_text = match boundaries.first() {
            Some((p, _)) => &after_set[..*p],
            None => after_set,
        };
        let where_text = clause_text(after_set, &boundaries, " WHERE ");
        let returning_col = clause_text(after_set, &boundaries, " RETURNING ").map(|s| s.to_string());

        let assignments: Vec<(String, String)> = assignments_text
            .split(", ")
            .filter_map(|part| part.split_once(" = ").map(|(c, v)| (c.trim().to_string(), v.trim().to_string())))
            .collect();

        let condition = where_text.map(parse_expr);

        let mut rows_out = Vec::new();
        let mut tables = self.tables.borrow_mut();
        if let Some(table_data) = tables.get_mut(&table) {
            for row in table_data.rows.iter_mut() {
                let matches = condition.as_ref().map(|c| eval_bool(c, &*row, params)).unwrap_or(true);
                if !matches {
                    continue;
                }
                for (col, raw) in &assignments {
                    let value = resolve_scalar(raw, params);
                    row.insert(format!("{table}.{col}"), value);
                }
                if let Some(ret_col) = &returning_col {
                    let key = format!("{table}.{ret_col}");
                    rows_out.push(vec![row.get(&key).cloned().unwrap_or(Value::Null)]);
                }
            }
        }
        let aliases = returning_col.map(|c| vec![c]);
        Ok(InMemoryCursor { aliases, rows: rows_out, index: 0, last_row_id: None })
    }

    fn execute_delete(&self, rest: &str, params: &HashMap<String, Value>) -> Result<InMemoryCursor, ExecutionError> {
        let boundaries = find_clause_boundaries(rest, &[" WHERE ", " RETURNING "]);
        let table = match boundaries.first() {
            Some((p, _)) => last_segment(rest[..*p].trim()),
            None => last_segment(rest.trim()),
        };
        let where_text = clause_text(rest, &boundaries, " WHERE ");
        let returning_col = clause_text(rest, &boundaries, " RETURNING ").map(|s| s.to_string());
        let condition = where_text.map(parse_expr);

        let mut rows_out = Vec::new();
        let mut tables = self.tables.borrow_mut();
        if let Some(table_data) = tables.get_mut(&table) {
            let (kept, removed): (Vec<Row>, Vec<Row>) = table_data
                .rows
                .drain(..)
                .partition(|row| !condition.as_ref().map(|c| eval_bool(c, row, params)).unwrap_or(true));
            table_data.rows = kept;
            for row in &removed {
                if let Some(ret_col) = &returning_col {
                    let key = format!("{table}.{ret_col}");
                    rows_out.push(vec![row.get(&key).cloned().unwrap_or(Value::Null)]);
                }
            }
        }
        let aliases = returning_col.map(|c| vec![c]);
        Ok(InMemoryCursor { aliases, rows: rows_out, index: 0, last_row_id: None })
    }

    fn execute_select(&self, rest: &str, params: &HashMap<String, Value>) -> Result<InMemoryCursor, ExecutionError> {
        let rest = rest.strip_prefix("DISTINCT ").unwrap_or(rest);
        let from_pos = rest.find(" FROM ").ok_or_else(|| fail("malformed SELECT: no FROM"))?;
        let items_text = &rest[..from_pos];
        let after_from = &rest[from_pos + " FROM ".len()..];

        let boundaries =
            find_clause_boundaries(after_from, &[" WHERE ", " GROUP BY ", " HAVING ", " ORDER BY ", " LIMIT ", " OFFSET "]);
        let table_and_joins = match boundaries.first() {
            Some((p, _)) => &after_from[..*p],
            None => after_from,
        };
        let (table_fqn, joins_text) = match table_and_joins.find(' ') {
            Some(p) => (&table_and_joins[..p], table_and_joins[p + 1..].trim()),
            None => (table_and_joins, ""),
        };
        let base_table = last_segment(table_fqn.trim());

        let mut rows: Vec<Row> = {
            let tables = self.tables.borrow();
            tables.get(&base_table).map(|t| t.rows.clone()).unwrap_or_default()
        };

        for join in split_joins(joins_text) {
            let target_table = last_segment(&join.table_fqn);
            let target_rows = {
                let tables = self.tables.borrow();
                tables.get(&target_table).map(|t| t.rows.clone()).unwrap_or_default()
            };
            let condition = parse_expr(&join.condition);
            let mut joined = Vec::new();
            for left_row in &rows {
                for right_row in &target_rows {
                    let mut merged = left_row.clone();
                    merged.extend(right_row.clone());
                    if eval_bool(&condition, &merged, params) {
                        joined.push(merged);
                    }
                }
            }
            rows = joined;
        }

        if let Some(where_text) = clause_text(after_from, &boundaries, " WHERE ") {
            let condition = parse_expr(where_text);
            rows.retain(|row| eval_bool(&condition, row, params));
        }

        let items = parse_projection(items_text);
        let aggregate_only = items.len() == 1 && matches!(items[0].0, ProjExpr::Function(..));

        if aggregate_only {
            let ProjExpr::Function(ref name, ref col) = items[0].0 else {
                unreachable!()
            };
            let value = compute_aggregate(name, col.as_deref(), &rows);
            return Ok(InMemoryCursor {
                aliases: Some(vec![items[0].1.clone()]),
                rows: vec![vec![value]],
                index: 0,
                last_row_id: None,
            });
        }

        if let Some(order_text) = clause_text(after_from, &boundaries, " ORDER BY ") {
            apply_order_by(&mut rows, order_text);
        }
        let limit = clause_text(after_from, &boundaries, " LIMIT ").and_then(|s| s.parse::<usize>().ok());
        let offset = clause_text(after_from, &boundaries, " OFFSET ")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);

        let mut projected = Vec::new();
        for row in rows.iter().skip(offset) {
            if let Some(limit) = limit {
                if projected.len() >= limit {
                    break;
                }
            }
            projected.push(items.iter().map(|(expr, _)| eval_projection(expr, row)).collect());
        }
        let aliases = items.iter().map(|(_, alias)| alias.clone()).collect();
        Ok(InMemoryCursor { aliases: Some(aliases), rows: projected, index: 0, last_row_id: None })
    }
}

impl Connection for InMemoryConnection {
    fn execute(&mut self, sql: &str, params: &Parameters) -> Result<Box<dyn Cursor>, ExecutionError> {
        self.execute_inner(sql, params).map(|c| Box::new(c) as Box<dyn Cursor>)
    }

    fn commit(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        *self.closed.borrow_mut() = true;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }
}

struct InMemoryCursor {
    aliases: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    index: usize,
    last_row_id: Option<i64>,
}

impl InMemoryCursor {
    fn empty() -> Self {
        InMemoryCursor { aliases: None, rows: Vec::new(), index: 0, last_row_id: None }
    }
}

impl Cursor for InMemoryCursor {
    fn column_aliases(&self) -> Option<&[String]> {
        self.aliases.as_deref()
    }

    fn next_row(&mut self) -> Option<Vec<Value>> {
        if self.index < self.rows.len() {
            let row = self.rows[self.index].clone();
            self.index += 1;
            Some(row)
        } else {
            None
        }
    }

    fn last_row_id(&self) -> Option<i64> {
        self.last_row_id
    }
}

// --- small text-shape helpers -------------------------------------------------

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn last_segment(s: &str) -> String {
    s.rsplit('.').next().unwrap_or(s).to_string()
}

/// Strips a single layer of surrounding double quotes, the quoting the
/// transpiler's reprinted `AS "COLUMN.*"` aliases carry so the dotted alias
/// parses as one identifier.
fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s)
}

fn last_two_segments(s: &str) -> String {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() >= 2 {
        format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        s.to_string()
    }
}

fn find_matching_close(s: &str, open_idx: usize) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for (i, byte) in bytes.iter().enumerate().skip(open_idx) {
        match *byte as char {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    s.len().saturating_sub(1)
}

fn find_clause_boundaries(s: &str, keywords: &[&'static str]) -> Vec<(usize, &'static str)> {
    let mut found: Vec<(usize, &'static str)> = keywords.iter().filter_map(|k| s.find(k).map(|p| (p, *k))).collect();
    found.sort_by_key(|(p, _)| *p);
    found
}

fn clause_text<'a>(s: &'a str, boundaries: &[(usize, &'static str)], keyword: &str) -> Option<&'a str> {
    let idx = boundaries.iter().position(|(_, k)| *k == keyword)?;
    let (start, kw) = boundaries[idx];
    let content_start = start + kw.len();
    let content_end = boundaries.get(idx + 1).map(|(p, _)| *p).unwrap_or(s.len());
    Some(s[content_start..content_end].trim())
}

struct JoinSpec {
    table_fqn: String,
    condition: String,
}

fn split_joins(s: &str) -> Vec<JoinSpec> {
    if s.is_empty() {
        return Vec::new();
    }
    let starts = ["CROSS JOIN ", "FULL JOIN ", "INNER JOIN ", "LEFT JOIN ", "RIGHT JOIN "];
    let mut positions: Vec<usize> = Vec::new();
    for start in starts {
        let mut from = 0;
        while let Some(p) = s[from..].find(start) {
            positions.push(from + p);
            from += p + 1;
        }
    }
    positions.sort_unstable();
    positions.dedup();

    let mut specs = Vec::new();
    for (i, &pos) in positions.iter().enumerate() {
        let end = positions.get(i + 1).copied().unwrap_or(s.len());
        let segment = s[pos..end].trim();
        if let Some(on_pos) = segment.find(" ON ") {
            let head = &segment[..on_pos];
            let condition = segment[on_pos + 4..].trim().to_string();
            let table_fqn = head.rsplit(' ').next().unwrap_or("").to_string();
            specs.push(JoinSpec { table_fqn, condition });
        }
    }
    specs
}

enum ProjExpr {
    Column(String),
    Function(String, Option<String>),
}

fn parse_projection(s: &str) -> Vec<(ProjExpr, String)> {
    s.split(", ")
        .filter(|s| !s.is_empty())
        .map(|item| {
            let (expr_text, alias) = item.split_once(" AS ").unwrap_or((item, item));
            let expr_text = expr_text.trim();
            let expr = if let Some(paren) = expr_text.find('(') {
                let name = expr_text[..paren].to_lowercase();
                let inner = &expr_text[paren + 1..expr_text.len().saturating_sub(1)];
                let col = if inner == "*" { None } else { Some(last_two_segments(inner)) };
                ProjExpr::Function(name, col)
            } else {
                ProjExpr::Column(last_two_segments(expr_text))
            };
            (expr, strip_quotes(alias.trim()).to_string())
        })
        .collect()
}

fn eval_projection(expr: &ProjExpr, row: &Row) -> Value {
    match expr {
        ProjExpr::Column(key) => row.get(key).cloned().unwrap_or(Value::Null),
        ProjExpr::Function(..) => Value::Null,
    }
}

fn compute_aggregate(name: &str, col: Option<&str>, rows: &[Row]) -> Value {
    if name == "count" {
        return Value::Int(rows.len() as i64);
    }
    let Some(col) = col else { return Value::Null };
    let values: Vec<f64> = rows.iter().filter_map(|r| r.get(col)).filter_map(value_as_f64).collect();
    if values.is_empty() {
        return Value::Null;
    }
    let all_whole = values.iter().all(|v| v.fract() == 0.0);
    let result = match name {
        "min" => values.iter().cloned().fold(f64::INFINITY, f64::min),
        "max" => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        "sum" => values.iter().sum(),
        "avg" => values.iter().sum::<f64>() / values.len() as f64,
        _ => return Value::Null,
    };
    if all_whole && name != "avg" {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn apply_order_by(rows: &mut [Row], text: &str) {
    let specs: Vec<(String, bool)> = text
        .split(", ")
        .map(|entry| {
            let entry = entry.trim();
            if let Some(col) = entry.strip_suffix(" DESC") {
                (last_two_segments(col.trim()), true)
            } else if let Some(col) = entry.strip_suffix(" ASC") {
                (last_two_segments(col.trim()), false)
            } else {
                (last_two_segments(entry), false)
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        for (key, desc) in &specs {
            let av = a.get(key).cloned().unwrap_or(Value::Null);
            let bv = b.get(key).cloned().unwrap_or(Value::Null);
            let ord = value_cmp(&av, &bv).unwrap_or(Ordering::Equal);
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::String(x), Value::String(y)) => x.partial_cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.partial_cmp(y),
        (Value::Date(x), Value::Date(y)) => x.partial_cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.partial_cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.partial_cmp(y),
        _ => None,
    }
}

fn resolve_scalar(raw: &str, params: &HashMap<String, Value>) -> Value {
    match raw.strip_prefix(':') {
        Some(name) => params.get(name).cloned().unwrap_or(Value::Null),
        None => Value::Null,
    }
}

// --- WHERE/HAVING/ON expression parsing --------------------------------------

#[derive(Clone)]
enum SqlValue {
    Placeholder(String),
    Column(String),
    Function(String, Option<String>),
    Unsupported,
}

#[derive(Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

enum BoolExpr {
    Compare { left: SqlValue, op: CmpOp, args: Vec<SqlValue> },
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

fn parse_expr(s: &str) -> BoolExpr {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('(') {
        let close = find_matching_close(s, 0);
        if close == s.len() - 1 {
            let inner = &rest[..close - 1];
            if let Some((left, op, right)) = split_top_level(inner) {
                let left = parse_expr(left.trim());
                let right = parse_expr(right.trim());
                return if op == "AND" {
                    BoolExpr::And(Box::new(left), Box::new(right))
                } else {
                    BoolExpr::Or(Box::new(left), Box::new(right))
                };
            }
            return parse_expr(inner);
        }
    }
    parse_comparison(s)
}

fn split_top_level(s: &str) -> Option<(&str, &str, &str)> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut i = 0usize;
    let mut pending_between = 0usize;
    while i < s.len() {
        let c = bytes[i] as char;
        if c == '(' {
            depth += 1;
            i += 1;
            continue;
        }
        if c == ')' {
            depth -= 1;
            i += 1;
            continue;
        }
        if depth == 0 {
            if s[i..].starts_with("NOT BETWEEN ") {
                pending_between += 1;
                i += "NOT BETWEEN ".len();
                continue;
            }
            if s[i..].starts_with("BETWEEN ") {
                pending_between += 1;
                i += "BETWEEN ".len();
                continue;
            }
            if s[i..].starts_with(" AND ") {
                if pending_between > 0 {
                    pending_between -= 1;
                    i += 5;
                    continue;
                }
                return Some((&s[..i], "AND", &s[i + 5..]));
            }
            if s[i..].starts_with(" OR ") {
                return Some((&s[..i], "OR", &s[i + 4..]));
            }
        }
        i += 1;
    }
    None
}

fn parse_comparison(s: &str) -> BoolExpr {
    let s = s.trim();
    let (left, rest) = parse_token(s);
    let rest = rest.trim_start();

    if rest.starts_with("IS NOT NULL") {
        return BoolExpr::Compare { left, op: CmpOp::IsNotNull, args: vec![] };
    }
    if rest.starts_with("IS NULL") {
        return BoolExpr::Compare { left, op: CmpOp::IsNull, args: vec![] };
    }
    if let Some(r) = rest.strip_prefix("NOT BETWEEN ") {
        let (lo, hi) = split_between(r);
        return BoolExpr::Compare { left, op: CmpOp::NotBetween, args: vec![parse_single(lo), parse_single(hi)] };
    }
    if let Some(r) = rest.strip_prefix("BETWEEN ") {
        let (lo, hi) = split_between(r);
        return BoolExpr::Compare { left, op: CmpOp::Between, args: vec![parse_single(lo), parse_single(hi)] };
    }
    if let Some(r) = rest.strip_prefix("NOT LIKE ") {
        return BoolExpr::Compare { left, op: CmpOp::NotLike, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix("LIKE ") {
        return BoolExpr::Compare { left, op: CmpOp::Like, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix("NOT IN (") {
        return BoolExpr::Compare { left, op: CmpOp::NotIn, args: parse_list(r) };
    }
    if let Some(r) = rest.strip_prefix("IN (") {
        return BoolExpr::Compare { left, op: CmpOp::In, args: parse_list(r) };
    }
    if let Some(r) = rest.strip_prefix("!=") {
        return BoolExpr::Compare { left, op: CmpOp::Ne, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix("<=") {
        return BoolExpr::Compare { left, op: CmpOp::Le, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix(">=") {
        return BoolExpr::Compare { left, op: CmpOp::Ge, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix('<') {
        return BoolExpr::Compare { left, op: CmpOp::Lt, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix('>') {
        return BoolExpr::Compare { left, op: CmpOp::Gt, args: vec![parse_single(r)] };
    }
    if let Some(r) = rest.strip_prefix('=') {
        return BoolExpr::Compare { left, op: CmpOp::Eq, args: vec![parse_single(r)] };
    }
    BoolExpr::Compare { left, op: CmpOp::IsNull, args: vec![] }
}

fn split_between(s: &str) -> (&str, &str) {
    match s.find(" AND ") {
        Some(pos) => (&s[..pos], &s[pos + 5..]),
        None => (s, ""),
    }
}

fn parse_single(s: &str) -> SqlValue {
    parse_token(s.trim()).0
}

fn parse_list(s: &str) -> Vec<SqlValue> {
    let s = s.trim_end_matches(')');
    s.split(", ").map(|t| parse_token(t.trim()).0).collect()
}

const AGGREGATE_NAMES: [&str; 5] = ["COUNT", "MIN", "MAX", "SUM", "AVG"];

fn parse_token(s: &str) -> (SqlValue, &str) {
    let s = s.trim_start();
    if let Some(paren) = s.find('(') {
        let prefix = &s[..paren];
        if !prefix.is_empty() && AGGREGATE_NAMES.contains(&prefix) {
            let close = find_matching_close(s, paren);
            let inner = &s[paren + 1..close];
            let col = if inner == "*" { None } else { Some(last_two_segments(inner)) };
            return (SqlValue::Function(prefix.to_lowercase(), col), &s[close + 1..]);
        }
    }
    if let Some(rest) = s.strip_prefix(':') {
        let end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(rest.len());
        return (SqlValue::Placeholder(rest[..end].to_string()), &rest[end..]);
    }
    if s.starts_with('(') {
        let close = find_matching_close(s, 0);
        return (SqlValue::Unsupported, &s[close + 1..]);
    }
    let end = s.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')).unwrap_or(s.len());
    (SqlValue::Column(last_two_segments(&s[..end])), &s[end..])
}

fn eval_operand(v: &SqlValue, row: &Row, params: &HashMap<String, Value>) -> Value {
    match v {
        SqlValue::Placeholder(name) => params.get(name).cloned().unwrap_or(Value::Null),
        SqlValue::Column(key) => row.get(key).cloned().unwrap_or(Value::Null),
        SqlValue::Function(..) | SqlValue::Unsupported => Value::Null,
    }
}

fn like_match(value: &Value, pattern: &Value) -> bool {
    let (Value::String(v), Value::String(p)) = (value, pattern) else {
        return false;
    };
    let mut regex_pattern = String::from("(?s)^");
    for c in p.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            other => regex_pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_pattern.push('$');
    Regex::new(&regex_pattern).map(|re| re.is_match(v)).unwrap_or(false)
}

fn is_between(value: &Value, lo: &Value, hi: &Value) -> bool {
    matches!(value_cmp(value, lo), Some(Ordering::Greater | Ordering::Equal))
        && matches!(value_cmp(value, hi), Some(Ordering::Less | Ordering::Equal))
}

fn eval_bool(expr: &BoolExpr, row: &Row, params: &HashMap<String, Value>) -> bool {
    match expr {
        BoolExpr::And(l, r) => eval_bool(l, row, params) && eval_bool(r, row, params),
        BoolExpr::Or(l, r) => eval_bool(l, row, params) || eval_bool(r, row, params),
        BoolExpr::Compare { left, op, args } => {
            let lv = eval_operand(left, row, params);
            match op {
                CmpOp::IsNull => lv == Value::Null,
                CmpOp::IsNotNull => lv != Value::Null,
                CmpOp::Eq => lv == eval_operand(&args[0], row, params),
                CmpOp::Ne => lv != eval_operand(&args[0], row, params),
                CmpOp::Lt => value_cmp(&lv, &eval_operand(&args[0], row, params)) == Some(Ordering::Less),
                CmpOp::Le => {
                    matches!(value_cmp(&lv, &eval_operand(&args[0], row, params)), Some(Ordering::Less | Ordering::Equal))
                }
                CmpOp::Gt => value_cmp(&lv, &eval_operand(&args[0], row, params)) == Some(Ordering::Greater),
                CmpOp::Ge => matches!(
                    value_cmp(&lv, &eval_operand(&args[0], row, params)),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                CmpOp::Like => like_match(&lv, &eval_operand(&args[0], row, params)),
                CmpOp::NotLike => !like_match(&lv, &eval_operand(&args[0], row, params)),
                CmpOp::In => args.iter().any(|a| lv == eval_operand(a, row, params)),
                CmpOp::NotIn => !args.iter().any(|a| lv == eval_operand(a, row, params)),
                CmpOp::Between => {
                    is_between(&lv, &eval_operand(&args[0], row, params), &eval_operand(&args[1], row, params))
                }
                CmpOp::NotBetween => {
                    !is_between(&lv, &eval_operand(&args[0], row, params), &eval_operand(&args[1], row, params))
                }
            }
        }
    }
}

// --- the dictionary reference schema -----------------------------------------

/// Builds the worked-example dictionary schema (`words`, `meanings`,
/// `tags`, `meaning_tags`, `examples`, `users`, `user_progress`) used across
/// this crate's own integration tests, wired to a fresh [`InMemoryConnection`].
pub fn dictionary_database(dialect: ESqlDialect) -> Rc<Database> {
    DatabaseBuilder::new("dictionary", dialect)
        .table(
            TableDef::new("words")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("word", datatype::TEXT).unique().not_null()),
        )
        .table(
            TableDef::new("meanings")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("word_id", datatype::INTEGER).references("words", "id").not_null())
                .column(ColumnDef::new("definition", datatype::TEXT).not_null()),
        )
        .table(
            TableDef::new("tags")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("name", datatype::TEXT).unique().not_null()),
        )
        .table(
            TableDef::new("meaning_tags")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("meaning_id", datatype::INTEGER).references("meanings", "id").not_null())
                .column(ColumnDef::new("tag_id", datatype::INTEGER).references("tags", "id").not_null()),
        )
        .table(
            TableDef::new("examples")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("meaning_id", datatype::INTEGER).references("meanings", "id").not_null())
                .column(ColumnDef::new("sentence", datatype::TEXT).not_null()),
        )
        .table(
            TableDef::new("users")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("email", datatype::TEXT).unique().not_null()),
        )
        .table(
            TableDef::new("user_progress")
                .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                .column(ColumnDef::new("user_id", datatype::INTEGER).references("users", "id").not_null())
                .column(ColumnDef::new("word_id", datatype::INTEGER).references("words", "id").not_null())
                .column(ColumnDef::new("learned", datatype::BOOLEAN).default(false)),
        )
        .connection(InMemoryConnection::new())
        .build()
        .expect("dictionary schema is internally consistent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn words_only() -> Rc<Database> {
        DatabaseBuilder::new("app", ESqlDialect::Sqlite)
            .table(
                TableDef::new("words")
                    .column(ColumnDef::new("id", datatype::INTEGER).primary_key())
                    .column(ColumnDef::new("word", datatype::TEXT)),
            )
            .connection(InMemoryConnection::new())
            .build()
            .unwrap()
    }

    #[test]
    fn insert_then_select_round_trips_a_row() {
        let db = words_only();
        let table = db.table("words").unwrap();
        let mut record = Record::new();
        record.set(table.column("word").unwrap(), "run");
        let id = table.insert(record).unwrap();
        assert_eq!(id, Some(1));

        let rows = table.select().render_and_fetch(&db);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn where_clause_filters_rows() {
        let db = words_only();
        let table = db.table("words").unwrap();
        for word in ["run", "walk", "jump"] {
            let mut record = Record::new();
            record.set(table.column("word").unwrap(), word);
            table.insert(record).unwrap();
        }
        let condition = table.column("word").unwrap().filters.is_equal("walk");
        let select = table.select().where_clause(condition);
        let (sql, params) = select.render(ESqlDialect::Sqlite).unwrap();
        let mut cursor = db.execute(&sql, &params).unwrap();
        let mut count = 0;
        while cursor.next_row().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn count_star_reports_the_row_count() {
        let db = words_only();
        let table = db.table("words").unwrap();
        for word in ["run", "walk"] {
            let mut record = Record::new();
            record.set(table.column("word").unwrap(), word);
            table.insert(record).unwrap();
        }
        let select = table
            .select()
            .items(vec![crate::record::RecordKey::Function(crate::expr::AggregateFunction::count())]);
        let (sql, params) = select.render(ESqlDialect::Sqlite).unwrap();
        let mut cursor = db.execute(&sql, &params).unwrap();
        let row = cursor.next_row().unwrap();
        assert_eq!(row[0], Value::Int(2));
    }

    #[test]
    fn update_and_delete_report_returning_row_counts() {
        let db = words_only();
        let table = db.table("words").unwrap();
        let mut record = Record::new();
        record.set(table.column("word").unwrap(), "run");
        table.insert(record).unwrap();

        let mut update_record = Record::new();
        update_record.set(table.column("word").unwrap(), "sprint");
        let updated = table
            .update(update_record, table.column("id").unwrap().filters.is_equal(1i64))
            .unwrap();
        assert_eq!(updated, 1);

        let deleted = table.delete(None).unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn dictionary_schema_builds_with_every_table() {
        let db = dictionary_database(ESqlDialect::Sqlite);
        for name in ["words", "meanings", "tags", "meaning_tags", "examples", "users", "user_progress"] {
            assert!(db.table(name).is_some(), "missing table {name}");
        }
    }

    #[test]
    fn like_pattern_matches_a_prefix() {
        let db = words_only();
        let table = db.table("words").unwrap();
        let mut record = Record::new();
        record.set(table.column("word").unwrap(), "running");
        table.insert(record).unwrap();

        let condition = table.column("word").unwrap().filters.is_like("run%");
        let select = table.select().where_clause(condition);
        let (sql, params) = select.render(ESqlDialect::Sqlite).unwrap();
        let mut cursor = db.execute(&sql, &params).unwrap();
        assert!(cursor.next_row().is_some());
    }

    trait SelectFetch {
        fn render_and_fetch(&self, db: &Database) -> Vec<Vec<Value>>;
    }

    impl SelectFetch for crate::statement::Select {
        fn render_and_fetch(&self, db: &Database) -> Vec<Vec<Value>> {
            let (sql, params) = self.render(db.dialect).unwrap();
            let mut cursor = db.execute(&sql, &params).unwrap();
            let mut rows = Vec::new();
            while let Some(row) = cursor.next_row() {
                rows.push(row);
            }
            rows
        }
    }
}
