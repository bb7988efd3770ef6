//! Seed data: literal rows per table, read from either a declarations file
//! (`const planets = [{ ... }]`) or a TOML manifest (`[[planets]]`).

pub mod declarations;
pub mod manifest;
pub mod run;

pub use declarations::{parse_seed_declarations, render_seed_declarations};
pub use manifest::parse_seed_manifest;
pub use run::{seed_database, SeedMode, SeedReport};

use indexmap::IndexMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// A literal seed value.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedValue {
    Str(String),
    Int(i64),
    Float(f64),
    /// A number kept as written because neither `i64` nor `f64` holds it
    /// exactly.
    Number(String),
    Bool(bool),
    Null,
}

impl fmt::Display for SeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedValue::Str(s) => f.write_str(s),
            SeedValue::Int(i) => write!(f, "{}", i),
            SeedValue::Float(x) => write!(f, "{}", x),
            SeedValue::Number(text) => f.write_str(text),
            SeedValue::Bool(b) => write!(f, "{}", b),
            SeedValue::Null => f.write_str("null"),
        }
    }
}

/// Column name to value for one row.
pub type SeedRow = IndexMap<String, SeedValue>;

/// Rows of one table. The first row fixes the column list.
pub type SeedTable = Vec<SeedRow>;

/// Table name to rows, in declaration order.
pub type SeedData = IndexMap<String, SeedTable>;

/// Read seed data, choosing the TOML manifest reader for `.toml` files and
/// the declarations reader for anything else.
pub fn load_seed(path: impl AsRef<Path>) -> Result<SeedData> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_seed_manifest(&text),
        _ => parse_seed_declarations(&text),
    }
}
