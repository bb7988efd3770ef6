//! Decide, per seed table, whether it has to be created before its rows are
//! inserted.

use indexmap::IndexSet;
use std::collections::HashSet;
use std::fmt;

/// What seeding does with one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Modeled but missing from the database.
    CreateAndInsert,
    /// Modeled and already present in the database.
    Insert,
    /// Not modeled; skipped with a warning.
    Invalid,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CreateAndInsert => "Create + Insert",
            Operation::Insert => "Insert",
            Operation::Invalid => "Invalid",
        })
    }
}

pub fn classify(table: &str, models: &HashSet<String>, database: &HashSet<String>) -> Operation {
    match (models.contains(table), database.contains(table)) {
        (true, false) => Operation::CreateAndInsert,
        (true, true) => Operation::Insert,
        (false, _) => Operation::Invalid,
    }
}

/// Table names known to the models, the live database and the seed data
/// for a single run.
#[derive(Debug, Clone, Default)]
pub struct TableNameSets {
    pub models: HashSet<String>,
    pub database: HashSet<String>,
    /// Seed tables in declaration order.
    pub seed: IndexSet<String>,
}

impl TableNameSets {
    pub fn new<M, D, S>(models: M, database: D, seed: S) -> Self
    where
        M: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
        S: IntoIterator<Item = String>,
    {
        TableNameSets {
            models: models.into_iter().collect(),
            database: database.into_iter().collect(),
            seed: seed.into_iter().collect(),
        }
    }

    pub fn operation(&self, table: &str) -> Operation {
        classify(table, &self.models, &self.database)
    }

    /// Every seed table with its operation, in seed declaration order.
    /// Foreign-key dependencies between tables are not considered.
    pub fn plan(&self) -> Vec<(String, Operation)> {
        self.seed
            .iter()
            .map(|table| (table.clone(), self.operation(table)))
            .collect()
    }
}
