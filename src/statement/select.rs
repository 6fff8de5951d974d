#![warn(missing_docs)]

//! `SELECT`.

use std::rc::Rc;

use crate::error::{BuildError, TransqlError};
use crate::expr::condition::SubselectOperand;
use crate::expr::{Condition, Join};
use crate::record::RecordKey;
use crate::schema::{Column, Table};
use crate::transpiler::{ESqlDialect, Parameters};

/// `ASC` or `DESC`, for an `ORDER BY` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    fn token(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One entry of a variadic `order_by(...)` call: either a selectable item,
/// or a direction marker immediately following one. The argument list
/// interleaves items and `ASC`/`DESC` tokens, e.g.
/// `order_by([id.into(), OrderByArg::Direction(Desc), name.into()])`.
pub enum OrderByArg {
    /// A column or aggregate function to order by.
    Item(RecordKey),
    /// A direction marker, applying to the item immediately before it.
    Direction(OrderDirection),
}

impl From<Rc<Column>> for OrderByArg {
    fn from(column: Rc<Column>) -> Self {
        OrderByArg::Item(RecordKey::Column(column))
    }
}

/// A `SELECT` statement: a table, projected items (columns/aggregates,
/// defaulting to every column of `table`), joins, an optional `WHERE`/
/// `HAVING`, `GROUP BY`/`ORDER BY` lists, `DISTINCT`, and `LIMIT`/`OFFSET`.
pub struct Select {
    table: Rc<Table>,
    items: Vec<RecordKey>,
    joins: Vec<Join>,
    where_clause: Option<Condition>,
    group_by: Vec<RecordKey>,
    having: Option<Condition>,
    order_by: Vec<(RecordKey, Option<OrderDirection>)>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    is_subquery: bool,
}

impl Select {
    /// Starts a `SELECT` over every column of `table`.
    pub fn new(table: Rc<Table>) -> Self {
        Select {
            table,
            items: Vec::new(),
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            distinct: false,
            limit: None,
            offset: None,
            is_subquery: false,
        }
    }

    /// Projects exactly these items instead of every column.
    pub fn items(mut self, items: Vec<RecordKey>) -> Self {
        self.items = items;
        self
    }

    /// Adds a join.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Sets the `WHERE` condition.
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Sets the `GROUP BY` items.
    pub fn group_by(mut self, items: Vec<RecordKey>) -> Self {
        self.group_by = items;
        self
    }

    /// Sets the `HAVING` condition.
    pub fn having(mut self, condition: Condition) -> Self {
        self.having = Some(condition);
        self
    }

    /// Sets the `ORDER BY` list from a flattened item/direction-marker
    /// sequence. Fails with [`BuildError::InvalidOrderByItem`] if a
    /// direction marker appears without a preceding item.
    pub fn order_by(mut self, args: Vec<OrderByArg>) -> Result<Self, BuildError> {
        let mut entries = Vec::new();
        let mut iter = args.into_iter().peekable();
        while let Some(arg) = iter.next() {
            match arg {
                OrderByArg::Item(item) => {
                    let direction = if matches!(iter.peek(), Some(OrderByArg::Direction(_))) {
                        match iter.next() {
                            Some(OrderByArg::Direction(d)) => Some(d),
                            _ => unreachable!(),
                        }
                    } else {
                        None
                    };
                    entries.push((item, direction));
                }
                OrderByArg::Direction(_) => return Err(BuildError::InvalidOrderByItem),
            }
        }
        self.order_by = entries;
        Ok(self)
    }

    /// Emits `DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sets `LIMIT`.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets `OFFSET`.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Marks this select as a sub-select, for callers that build it only
    /// to embed via [`Select::as_subselect`].
    pub fn as_subquery(mut self) -> Self {
        self.is_subquery = true;
        self
    }

    fn projected_items(&self) -> Vec<RecordKey> {
        if self.items.is_empty() {
            self.table.columns().iter().cloned().map(RecordKey::Column).collect()
        } else {
            self.items.clone()
        }
    }

    /// Renders the canonical (SQLite-dialect) template and its named
    /// parameter map. Parameters are `where.params ∪ having.params`.
    pub fn template(&self) -> (String, Vec<(String, crate::value::Value)>) {
        let items = self.projected_items();
        let projected = items
            .iter()
            .map(|item| format!("{} AS \"{}\"", item.to_sql(), item.alias()))
            .collect::<Vec<_>>()
            .join(", ");
        let distinct = if self.distinct { "DISTINCT " } else { "" };

        let mut sql = format!(
            "SELECT {distinct}{projected} FROM {}",
            self.table.fully_qualified_name()
        );
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        let mut parameters = Vec::new();
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.to_sql());
            parameters.extend(where_clause.parameters().iter().cloned());
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.iter().map(|i| i.to_sql()).collect::<Vec<_>>().join(", "));
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.to_sql());
            parameters.extend(having.parameters().iter().cloned());
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let rendered = self
                .order_by
                .iter()
                .map(|(item, direction)| match direction {
                    Some(d) => format!("{} {}", item.to_sql(), d.token()),
                    None => item.to_sql(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&rendered);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        (sql, parameters)
    }

    /// The aliases this select projects, in order (what a decoding
    /// cursor's `column_aliases()` is expected to echo back).
    pub fn aliases(&self) -> Vec<String> {
        self.projected_items().iter().map(|item| item.alias()).collect()
    }

    /// Embeds this select as a parenthesized sub-select operand. Fails
    /// with [`BuildError::SubselectColumnCountMismatch`] unless it
    /// projects exactly one column (a sub-select used on the RHS of a
    /// scalar comparison must return one).
    pub fn as_subselect(&self) -> Result<SubselectOperand, BuildError> {
        let items = self.projected_items();
        if items.len() != 1 {
            return Err(BuildError::SubselectColumnCountMismatch { actual: items.len() });
        }
        let (sql, parameters) = self.template();
        Ok(SubselectOperand { sql, parameters })
    }

    /// Renders this statement's SQL and parameters for `dialect`.
    pub fn render(&self, dialect: ESqlDialect) -> Result<(String, Parameters), TransqlError> {
        let (template, params) = self.template();
        super::transpile(&template, Parameters::Named(params), dialect)
    }
}
