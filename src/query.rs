//! Chainable single-statement query builder validated against a model's
//! static column metadata.
//!
//! ```ignore
//! let rows = Planets::query()
//!     .select(&["name", "climate"])?
//!     .r#where(&["climate = temperate"])?
//!     .fetch_all(&pool)
//!     .await?;
//! ```

use regex::Regex;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{FromRow, PgExecutor};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::ir::TableMetadata;

/// Static description of a table, implemented by generated model structs.
pub trait Model {
    const TABLE: &'static str;

    fn columns() -> TableMetadata;

    /// A fresh builder with no statement in progress.
    fn query() -> QueryBuilder {
        QueryBuilder::new(Self::TABLE, &Self::columns())
    }
}

/// Accumulates one SQL statement for one table. An empty statement means
/// no query is in progress.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    sql: String,
    has_where: bool,
}

const CONNECTIVES: &[&str] = &["AND", "OR", "NOT"];

fn condition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*(\w+)\s*(>=|<=|=|>|<|\bLIKE\b)\s*(.+?)\s*$").expect("valid regex")
    })
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>, columns: &TableMetadata) -> Self {
        QueryBuilder {
            table: table.into(),
            columns: columns.column_names().map(String::from).collect(),
            sql: String::new(),
            has_where: false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The statement built so far; empty when idle.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_idle(&self) -> bool {
        self.sql.is_empty()
    }

    /// Discard the pending statement.
    pub fn reset(&mut self) {
        self.sql.clear();
        self.has_where = false;
    }

    /// Take the pending statement, leaving the builder idle.
    pub fn take_sql(&mut self) -> String {
        self.has_where = false;
        std::mem::take(&mut self.sql)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(Error::AlreadyInProgress {
                table: self.table.clone(),
                sql: self.sql.clone(),
            })
        }
    }

    fn ensure_column(&self, column: &str) -> Result<()> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(Error::UnknownColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
        }
    }

    /// Start `SELECT <columns> FROM <table>`. No columns selects `*`.
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        self.ensure_idle()?;
        for column in columns.iter().filter(|c| **c != "*") {
            self.ensure_column(column)?;
        }
        let list = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        };
        self.sql = format!("SELECT {} FROM {}", list, self.table);
        Ok(self)
    }

    /// Start `DELETE FROM <table>`.
    pub fn delete(mut self) -> Result<Self> {
        self.ensure_idle()?;
        self.sql = format!("DELETE FROM {}", self.table);
        Ok(self)
    }

    /// Append conditions of the form `<column> <op> <value>`, op being one
    /// of `=`, `>`, `<`, `>=`, `<=` or `LIKE`. Values are single-quoted.
    /// Conditions within one call are space-joined; `AND`, `OR` and `NOT`
    /// may be passed as standalone arguments, `AND`/`OR` only between two
    /// conditions and `NOT` only before one. On an idle builder the
    /// statement starts as `SELECT * FROM <table>`.
    pub fn r#where(mut self, conditions: &[&str]) -> Result<Self> {
        let mut clauses = Vec::with_capacity(conditions.len());
        // Whether the last clause was a condition.
        let mut after_operand = false;
        for condition in conditions {
            let trimmed = condition.trim();
            if CONNECTIVES.iter().any(|c| c.eq_ignore_ascii_case(trimmed)) {
                let connective = trimmed.to_ascii_uppercase();
                if (connective == "NOT") == after_operand {
                    return Err(self.malformed(condition));
                }
                clauses.push(connective);
                after_operand = false;
                continue;
            }
            clauses.push(self.parse_condition(condition)?);
            after_operand = true;
        }
        if clauses.is_empty() {
            return Ok(self);
        }
        if !after_operand {
            return Err(self.malformed(conditions[conditions.len() - 1]));
        }

        if self.is_idle() {
            self.sql = format!("SELECT * FROM {}", self.table);
        }
        if self.has_where {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.has_where = true;
        }
        self.sql.push_str(&clauses.join(" "));
        Ok(self)
    }

    fn malformed(&self, condition: &str) -> Error {
        Error::MalformedCondition {
            table: self.table.clone(),
            condition: condition.to_string(),
        }
    }

    fn parse_condition(&self, condition: &str) -> Result<String> {
        let caps = condition_regex()
            .captures(condition)
            .ok_or_else(|| self.malformed(condition))?;
        let column = &caps[1];
        self.ensure_column(column)?;
        let op = caps[2].to_ascii_uppercase();
        Ok(format!("{} {} {}", column, op, quote_value(&caps[3])))
    }

    /// Run the statement and return its rows.
    pub async fn fetch_all<'e, E>(self, executor: E) -> Result<Vec<PgRow>>
    where
        E: PgExecutor<'e>,
    {
        let sql = self.sql;
        Ok(sqlx::query(&sql).fetch_all(executor).await?)
    }

    /// Run the statement and decode every row as `T`.
    pub async fn fetch_as<'e, T, E>(self, executor: E) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: PgExecutor<'e>,
    {
        let sql = self.sql;
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(executor).await?)
    }

    /// Run a statement that returns no rows, such as a `DELETE`.
    pub async fn execute<'e, E>(self, executor: E) -> Result<PgQueryResult>
    where
        E: PgExecutor<'e>,
    {
        let sql = self.sql;
        Ok(sqlx::query(&sql).execute(executor).await?)
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

// A value already wrapped in matching quotes is unwrapped first.
fn quote_value(raw: &str) -> String {
    let inner = ['\'', '"']
        .iter()
        .find_map(|q| {
            raw.strip_prefix(*q).and_then(|s| s.strip_suffix(*q))
        })
        .unwrap_or(raw);
    format!("'{}'", inner.replace('\'', "''"))
}
