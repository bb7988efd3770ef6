//! SQL text for creating modeled tables and inserting seed rows.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::ir::{ColumnType, TableMetadata};
use crate::seed::{SeedTable, SeedValue};

/// Auto-increment columns are always created with this type.
pub const AUTO_INCREMENT_TYPE: &str = "SERIAL";

/// A `CREATE TABLE` followed by the `ALTER TABLE ... ADD CONSTRAINT`
/// statements for its foreign keys and check groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableQuery {
    pub create: String,
    pub foreign_keys: Vec<String>,
    pub checks: Vec<String>,
}

impl CreateTableQuery {
    /// Statements in the order they must be issued.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.create.as_str())
            .chain(self.foreign_keys.iter().map(String::as_str))
            .chain(self.checks.iter().map(String::as_str))
    }
}

impl fmt::Display for CreateTableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in self.statements() {
            writeln!(f, "{};", stmt)?;
        }
        Ok(())
    }
}

pub fn create_table_query(table: &str, columns: &TableMetadata) -> Result<CreateTableQuery> {
    let mut defs = Vec::with_capacity(columns.len());
    let mut foreign_keys = Vec::new();
    let mut checks = Vec::new();

    for (name, col) in columns {
        let mut def = if col.auto_increment {
            format!("{} {}", name, AUTO_INCREMENT_TYPE)
        } else {
            let ty = match &col.column_type {
                ColumnType::Sql(tag) => tag.as_str(),
                ColumnType::Enum(enum_name) => enum_name.as_str(),
            };
            match col.length {
                Some(len) if !ty.contains('(') => format!("{} {}({})", name, ty, len),
                _ => format!("{} {}", name, ty),
            }
        };
        if col.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if col.not_null {
            def.push_str(" NOT NULL");
        }
        if col.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &col.default_val {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        defs.push(def);

        if let Some(assoc) = &col.association {
            if assoc.mapped_table.is_empty() || assoc.mapped_column.is_empty() {
                return Err(Error::constraint(
                    table,
                    name,
                    format!("association `{}` needs both mappedTable and mappedColumn", assoc.name),
                ));
            }
            foreign_keys.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {}_{}_fkey{} FOREIGN KEY (\"{}\") REFERENCES {}({})",
                table,
                table,
                name,
                foreign_keys.len(),
                name,
                assoc.mapped_table,
                assoc.mapped_column
            ));
        }

        for (constraint, conditions) in &col.checks {
            if conditions.is_empty() {
                return Err(Error::constraint(
                    table,
                    name,
                    format!("check `{}` has no conditions", constraint),
                ));
            }
            let body = conditions
                .iter()
                .map(|c| rewrite_check_condition(c).map_err(|reason| Error::constraint(table, name, reason)))
                .collect::<Result<Vec<_>>>()?
                .join(" AND ");
            checks.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT \"{}\" CHECK ({})",
                table, constraint, body
            ));
        }
    }

    Ok(CreateTableQuery {
        create: format!("CREATE TABLE IF NOT EXISTS {} ({})", table, defs.join(", ")),
        foreign_keys,
        checks,
    })
}

fn membership_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\w+)\s*=\s*\[(.*)\]\s*$").expect("valid regex"))
}

/// Rewrite `column = [v1, v2]` to `column in (v1, v2)`; any other non-empty
/// condition, including catalog forms such as `= ANY (ARRAY[...])`, is
/// returned unchanged.
pub fn rewrite_check_condition(condition: &str) -> std::result::Result<String, String> {
    if condition.trim().is_empty() {
        return Err("empty check condition".to_string());
    }
    match membership_regex().captures(condition) {
        Some(caps) => {
            let values = caps[2].trim();
            if values.is_empty() {
                return Err(format!("membership list in `{}` is empty", condition));
            }
            Ok(format!("{} in ({})", &caps[1], values))
        }
        None => Ok(condition.to_string()),
    }
}

/// `CREATE TYPE` for an enum, labels in declared order.
pub fn create_enum_query(name: &str, labels: &[String]) -> Result<String> {
    if let Some(label) = labels.iter().find(|l| l.contains('\'')) {
        return Err(Error::constraint(
            name,
            label.clone(),
            "enum labels cannot contain apostrophes",
        ));
    }
    let labels = labels
        .iter()
        .map(|l| format!("'{}'", l))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("CREATE TYPE {} AS ENUM ({})", name, labels))
}

/// Batched `INSERT` for every row of a seed table. Columns come from the
/// first row and every value is single-quoted as text, so a value holding
/// an apostrophe is rejected.
pub fn insert_query(rows: &SeedTable, table: &str) -> Result<String> {
    let first = rows
        .first()
        .ok_or_else(|| Error::seed_format(table, "seed table has no rows"))?;
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut tuples = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(Error::seed_format(
                table,
                format!("row {} has {} columns, expected {}", idx, row.len(), columns.len()),
            ));
        }
        let mut values = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = row.get(*column).ok_or_else(|| {
                Error::seed_format(table, format!("row {} is missing column `{}`", idx, column))
            })?;
            values.push(quote_literal(table, column, value)?);
        }
        tuples.push(format!("({})", values.join(", ")));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        tuples.join(", ")
    ))
}

fn quote_literal(table: &str, column: &str, value: &SeedValue) -> Result<String> {
    if matches!(value, SeedValue::Null) {
        return Ok("NULL".to_string());
    }
    let text = value.to_string();
    if text.contains('\'') {
        return Err(Error::UnsupportedLiteral {
            table: table.to_string(),
            column: column.to_string(),
            value: text,
        });
    }
    Ok(format!("'{}'", text))
}
