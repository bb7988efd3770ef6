//! Error types shared by introspection, seeding and the query builder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A builder call tried to start a statement while another is pending.
    #[error("a query is already in progress on table `{table}`: {sql}")]
    AlreadyInProgress { table: String, sql: String },

    #[error("column `{column}` does not exist on table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("malformed condition on table `{table}`: `{condition}` (expected `<column> <op> <value>` with op one of =, >, <, >=, <=, LIKE)")]
    MalformedCondition { table: String, condition: String },

    #[error("malformed seed declaration `{declaration}`: {reason}")]
    SeedFormat { declaration: String, reason: String },

    /// Seed table with no model definition. Seeding logs and skips these.
    #[error("seed table `{table}` is not defined in the models")]
    UnmodeledTable { table: String },

    #[error("introspection failed while {context}: {source}")]
    Introspection {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot generate constraint for `{table}.{column}`: {reason}")]
    ConstraintGeneration {
        table: String,
        column: String,
        reason: String,
    },

    /// Seed values are quoted verbatim, so apostrophes cannot be represented.
    #[error("seed value for `{table}.{column}` contains an apostrophe, which is not supported: {value}")]
    UnsupportedLiteral {
        table: String,
        column: String,
        value: String,
    },

    /// A generated statement was rejected by the database.
    #[error("statement for table `{table}` failed: {source}\n  {sql}")]
    Statement {
        table: String,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn introspection(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let context = context.into();
        move |source| Error::Introspection { context, source }
    }

    pub(crate) fn seed_format(declaration: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SeedFormat {
            declaration: declaration.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn constraint(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ConstraintGeneration {
            table: table.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }
}
