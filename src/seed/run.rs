use sqlx::PgPool;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::introspect;
use crate::ir::Schema;
use crate::reconcile::{Operation, TableNameSets};
use crate::seed::SeedData;
use crate::sql::{create_enum_query, create_table_query, insert_query};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    #[default]
    Execute,
    /// Classify against the live database but only collect the SQL.
    DryRun,
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    /// Seeded tables and what was done to each, in issue order.
    pub operations: Vec<(String, Operation)>,
    /// Seed tables without a model definition.
    pub skipped: Vec<String>,
    pub statements: Vec<String>,
}

/// Create missing modeled tables and insert every seed table's rows.
///
/// Tables are processed in seed order on a single pooled connection, which
/// is returned to the pool on every exit path. Unmodeled tables are logged
/// and skipped; any other failure aborts the remaining tables.
#[tracing::instrument(skip_all, fields(tables = seed.len(), ?mode))]
pub async fn seed_database(
    pool: &PgPool,
    models: &Schema,
    seed: &SeedData,
    mode: SeedMode,
) -> Result<SeedReport> {
    let db_tables = introspect::table_names(pool).await?;
    let db_enums = introspect::enum_types(pool).await?;
    let sets = TableNameSets::new(models.table_names(), db_tables, seed.keys().cloned());
    let mut conn = pool.acquire().await?;

    let mut report = SeedReport::default();
    let mut created_enums: HashSet<String> = db_enums.keys().cloned().collect();

    for (table, operation) in sets.plan() {
        let rows = &seed[table.as_str()];
        let mut statements = Vec::new();

        match operation {
            Operation::Invalid => {
                let err = Error::UnmodeledTable { table: table.clone() };
                warn!(table = %table, "{}, skipping", err);
                report.skipped.push(table);
                continue;
            }
            Operation::CreateAndInsert => {
                let columns = models
                    .tables
                    .get(&table)
                    .ok_or_else(|| Error::UnmodeledTable { table: table.clone() })?;
                for (column, meta) in columns {
                    let Some(enum_name) = meta.enum_name() else {
                        continue;
                    };
                    if created_enums.contains(enum_name) {
                        continue;
                    }
                    let labels = models.enums.get(enum_name).ok_or_else(|| {
                        Error::constraint(
                            table.as_str(),
                            column.as_str(),
                            format!("enum `{}` is not declared in the models", enum_name),
                        )
                    })?;
                    statements.push(create_enum_query(enum_name, labels)?);
                    created_enums.insert(enum_name.to_string());
                }
                let create = create_table_query(&table, columns)?;
                statements.extend(create.statements().map(String::from));
            }
            Operation::Insert => {}
        }

        if rows.is_empty() {
            warn!(table = %table, "seed table has no rows, nothing to insert");
        } else {
            statements.push(insert_query(rows, &table)?);
        }

        if mode == SeedMode::Execute {
            for stmt in &statements {
                debug!(sql = %stmt, "executing");
                sqlx::query(stmt)
                    .execute(&mut *conn)
                    .await
                    .map_err(|source| Error::Statement {
                        table: table.clone(),
                        sql: stmt.clone(),
                        source,
                    })?;
            }
        }
        info!(table = %table, operation = %operation, rows = rows.len(), "seeded table");
        report.statements.extend(statements);
        report.operations.push((table, operation));
    }

    Ok(report)
}
