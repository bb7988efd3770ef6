pub mod codegen;
pub mod config;
pub mod error;
pub mod introspect;
pub mod ir;
pub mod query;
pub mod reconcile;
pub mod seed;
pub mod sql;
pub mod type_map;

pub use config::Config;
pub use error::{Error, Result};
pub use ir::{Association, ColumnMetadata, ColumnType, EnumMetadata, Schema, TableMetadata};
pub use query::{Model, QueryBuilder};
pub use reconcile::Operation;
pub use seed::{load_seed, seed_database, SeedData, SeedMode, SeedReport, SeedValue};
pub use type_map::TypeMap;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

/// Open a small pool against a PostgreSQL URL. Every run issues its
/// statements over a single connection, so one is enough.
pub async fn connect_pool(url: &str) -> Result<PgPool> {
    if !is_postgres_url(url) {
        return Err(Error::Introspection {
            context: "connecting to the database".into(),
            source: sqlx::Error::Configuration(
                format!("unsupported database URL: {}", url).into(),
            ),
        });
    }
    PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .map_err(Error::introspection("connecting to the database"))
}

/// Introspect the database and render its model source in one step.
pub async fn pull_models(pool: &PgPool, types: &TypeMap) -> Result<(Schema, String)> {
    let schema = introspect::introspect(pool).await?;
    let source = codegen::generate_models(&schema, types);
    info!(
        tables = schema.tables.len(),
        enums = schema.enums.len(),
        "generated model source"
    );
    Ok((schema, source))
}

/// Consistency problems in a models manifest that would otherwise only
/// surface as database errors while seeding.
pub fn lint_schema(schema: &Schema) -> Vec<String> {
    let mut errors = Vec::new();

    for (table, columns) in &schema.tables {
        if columns.is_empty() {
            errors.push(format!("Table {} defines no columns", table));
        } else if !columns.iter().any(|(_, c)| c.primary_key) {
            errors.push(format!("Table {} has no primary key", table));
        }

        for (column, meta) in columns {
            if let Some(enum_name) = meta.enum_name() {
                if !schema.enums.contains_key(enum_name) {
                    errors.push(format!(
                        "Column {}.{} uses undeclared enum {}",
                        table, column, enum_name
                    ));
                }
            }

            if let Some(assoc) = &meta.association {
                match schema.tables.get(&assoc.mapped_table) {
                    Some(target) => {
                        if !target.contains(&assoc.mapped_column) {
                            errors.push(format!(
                                "Association {} on {}.{} references unknown column {}.{}",
                                assoc.name, table, column, assoc.mapped_table, assoc.mapped_column
                            ));
                        }
                    }
                    None => errors.push(format!(
                        "Association {} on {}.{} references unknown table {}",
                        assoc.name, table, column, assoc.mapped_table
                    )),
                }
            }

            for (check, conditions) in &meta.checks {
                if conditions.is_empty() {
                    errors.push(format!(
                        "Check {} on {}.{} has no conditions",
                        check, table, column
                    ));
                }
                for condition in conditions {
                    if let Err(reason) = sql::rewrite_check_condition(condition) {
                        errors.push(format!(
                            "Check {} on {}.{} has malformed condition `{}`: {}",
                            check, table, column, condition, reason
                        ));
                    }
                }
            }
        }
    }

    for (name, labels) in &schema.enums {
        if labels.is_empty() {
            errors.push(format!("Enum {} declares no labels", name));
        }
    }

    errors
}
