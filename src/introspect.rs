//! Read tables, columns, constraints and enum types from a live PostgreSQL
//! catalog into a [`Schema`].

use indexmap::IndexMap;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ir::{Association, ColumnMetadata, ColumnType, EnumMetadata, Schema, TableMetadata};

const TABLES_SQL: &str = "SELECT table_name::text AS table_name FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const ENUMS_SQL: &str = "SELECT t.typname::text AS typname, e.enumlabel::text AS enumlabel FROM pg_type t \
     JOIN pg_enum e ON t.oid = e.enumtypid \
     JOIN pg_namespace n ON n.oid = t.typnamespace \
     WHERE n.nspname = 'public' ORDER BY t.typname, e.enumsortorder";

const COLUMNS_SQL: &str = "SELECT column_name::text AS column_name, data_type::text AS data_type, \
     udt_name::text AS udt_name, is_nullable::text AS is_nullable, \
     column_default::text AS column_default, \
     character_maximum_length::int4 AS length, is_identity::text AS is_identity \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name = $1 \
     ORDER BY ordinal_position";

// Single-column constraints only; composite keys and checks have no
// per-column representation.
const CONSTRAINTS_SQL: &str = "SELECT c.conname::text AS name, c.contype::text AS kind, \
     a.attname::text AS column_name, pg_get_constraintdef(c.oid) AS definition, \
     f.relname::text AS foreign_table, fa.attname::text AS foreign_column \
     FROM pg_constraint c \
     JOIN pg_class t ON t.oid = c.conrelid \
     JOIN pg_namespace n ON n.oid = t.relnamespace \
     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = c.conkey[1] \
     LEFT JOIN pg_class f ON f.oid = c.confrelid \
     LEFT JOIN pg_attribute fa ON fa.attrelid = c.confrelid AND fa.attnum = c.confkey[1] \
     WHERE n.nspname = 'public' AND t.relname = $1 \
     AND array_length(c.conkey, 1) = 1 AND c.contype IN ('p', 'u', 'c', 'f') \
     ORDER BY c.conname";

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, Default)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub length: Option<i32>,
    pub identity: bool,
}

/// One single-column row of `pg_constraint`.
#[derive(Debug, Clone)]
pub struct CatalogConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub column: String,
    pub definition: String,
    pub foreign_table: Option<String>,
    pub foreign_column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check,
    ForeignKey,
}

impl ConstraintKind {
    fn from_contype(contype: &str) -> Option<Self> {
        match contype {
            "p" => Some(ConstraintKind::PrimaryKey),
            "u" => Some(ConstraintKind::Unique),
            "c" => Some(ConstraintKind::Check),
            "f" => Some(ConstraintKind::ForeignKey),
            _ => None,
        }
    }
}

/// Introspect every base table and enum type in the `public` schema.
#[tracing::instrument(skip(pool))]
pub async fn introspect(pool: &PgPool) -> Result<Schema> {
    let enums = enum_types(pool).await?;
    let mut tables = IndexMap::new();
    for table in table_names(pool).await? {
        let columns = table_columns(pool, &table, &enums).await?;
        debug!(table = %table, columns = columns.len(), "introspected table");
        tables.insert(table, columns);
    }
    info!(tables = tables.len(), enums = enums.len(), "introspection complete");
    Ok(Schema { tables, enums })
}

/// Names of the base tables in the `public` schema, sorted.
pub async fn table_names(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query(TABLES_SQL)
        .fetch_all(pool)
        .await
        .map_err(Error::introspection("listing tables"))?;
    rows.iter()
        .map(|r| get(r, "table_name", "listing tables"))
        .collect()
}

/// Enum type names to labels, labels in `enumsortorder`.
pub async fn enum_types(pool: &PgPool) -> Result<EnumMetadata> {
    let rows = sqlx::query(ENUMS_SQL)
        .fetch_all(pool)
        .await
        .map_err(Error::introspection("listing enum types"))?;
    let mut enums = EnumMetadata::new();
    for r in rows {
        let name: String = get(&r, "typname", "listing enum types")?;
        let label: String = get(&r, "enumlabel", "listing enum types")?;
        enums.entry(name).or_default().push(label);
    }
    Ok(enums)
}

async fn table_columns(pool: &PgPool, table: &str, enums: &EnumMetadata) -> Result<TableMetadata> {
    let context = format!("reading columns of `{}`", table);
    let rows = sqlx::query(COLUMNS_SQL)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(Error::introspection(context.clone()))?;

    let mut columns = TableMetadata::new();
    for r in rows {
        let is_nullable: String = get(&r, "is_nullable", &context)?;
        let is_identity: Option<String> = get(&r, "is_identity", &context)?;
        let col = CatalogColumn {
            name: get(&r, "column_name", &context)?,
            data_type: get(&r, "data_type", &context)?,
            udt_name: get(&r, "udt_name", &context)?,
            nullable: is_nullable == "YES",
            default: get(&r, "column_default", &context)?,
            length: get(&r, "length", &context)?,
            identity: is_identity.as_deref() == Some("YES"),
        };
        columns.insert(col.name.clone(), column_metadata(&col, enums));
    }

    let context = format!("reading constraints of `{}`", table);
    let rows = sqlx::query(CONSTRAINTS_SQL)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(Error::introspection(context.clone()))?;
    for r in rows {
        let kind: String = get(&r, "kind", &context)?;
        let Some(kind) = ConstraintKind::from_contype(&kind) else {
            continue;
        };
        let constraint = CatalogConstraint {
            name: get(&r, "name", &context)?,
            kind,
            column: get(&r, "column_name", &context)?,
            definition: get(&r, "definition", &context)?,
            foreign_table: get(&r, "foreign_table", &context)?,
            foreign_column: get(&r, "foreign_column", &context)?,
        };
        apply_constraint(&mut columns, constraint);
    }
    Ok(columns)
}

fn get<'r, T>(row: &'r PgRow, column: &str, context: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(Error::introspection(context))
}

/// Type tag for a catalog column: enums by name, arrays as `elem[]`,
/// everything else by `data_type`.
pub fn sql_type_tag(data_type: &str, udt_name: &str, enums: &EnumMetadata) -> ColumnType {
    match data_type {
        "USER-DEFINED" if enums.contains_key(udt_name) => ColumnType::Enum(udt_name.to_string()),
        "USER-DEFINED" => ColumnType::Sql(udt_name.to_string()),
        "ARRAY" => ColumnType::Sql(format!("{}[]", udt_name.trim_start_matches('_'))),
        other => ColumnType::Sql(other.to_string()),
    }
}

/// Column metadata before constraints are applied. Sequence-backed and
/// identity columns become `autoIncrement` and drop their default.
pub fn column_metadata(col: &CatalogColumn, enums: &EnumMetadata) -> ColumnMetadata {
    let mut meta = match sql_type_tag(&col.data_type, &col.udt_name, enums) {
        ColumnType::Enum(name) => ColumnMetadata::enumeration(name),
        ColumnType::Sql(tag) => ColumnMetadata::sql(tag),
    }
    .not_null(!col.nullable);
    if let Some(len) = col.length.and_then(|l| u32::try_from(l).ok()) {
        meta = meta.length(len);
    }
    let sequence = col
        .default
        .as_deref()
        .is_some_and(|d| d.starts_with("nextval("));
    if col.identity || sequence {
        meta = meta.auto_increment();
    } else if let Some(default) = &col.default {
        meta = meta.default_val(default.clone());
    }
    meta
}

/// Fold one catalog constraint into the column it belongs to.
pub fn apply_constraint(columns: &mut TableMetadata, constraint: CatalogConstraint) {
    let Some(col) = columns.get_mut(&constraint.column) else {
        return;
    };
    match constraint.kind {
        ConstraintKind::PrimaryKey => col.primary_key = true,
        ConstraintKind::Unique => col.unique = true,
        ConstraintKind::Check => {
            let condition = check_body(&constraint.definition);
            col.checks.entry(constraint.name).or_default().push(condition);
        }
        ConstraintKind::ForeignKey => {
            if let (Some(table), Some(column)) = (constraint.foreign_table, constraint.foreign_column) {
                col.association = Some(Association::new(constraint.name, table, column));
            }
        }
    }
}

// `CHECK ((a > 0)) NOT VALID` -> `(a > 0)`
fn check_body(definition: &str) -> String {
    let def = definition.trim();
    let def = def.strip_suffix("NOT VALID").map(str::trim_end).unwrap_or(def);
    match def.strip_prefix("CHECK (").and_then(|d| d.strip_suffix(')')) {
        Some(body) => body.to_string(),
        None => def.to_string(),
    }
}
