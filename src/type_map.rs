use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// SQL type tag to Rust type used in generated model structs.
const SQL_TYPES: &[(&str, &str)] = &[
    ("smallint", "i16"),
    ("int2", "i16"),
    ("smallserial", "i16"),
    ("integer", "i32"),
    ("int", "i32"),
    ("int4", "i32"),
    ("serial", "i32"),
    ("bigint", "i64"),
    ("int8", "i64"),
    ("bigserial", "i64"),
    ("real", "f32"),
    ("float4", "f32"),
    ("double precision", "f64"),
    ("float8", "f64"),
    ("numeric", "rust_decimal::Decimal"),
    ("decimal", "rust_decimal::Decimal"),
    ("boolean", "bool"),
    ("bool", "bool"),
    ("text", "String"),
    ("character varying", "String"),
    ("varchar", "String"),
    ("character", "String"),
    ("char", "String"),
    ("bpchar", "String"),
    ("citext", "String"),
    ("name", "String"),
    ("uuid", "uuid::Uuid"),
    ("date", "chrono::NaiveDate"),
    ("time", "chrono::NaiveTime"),
    ("time without time zone", "chrono::NaiveTime"),
    ("timestamp", "chrono::NaiveDateTime"),
    ("timestamp without time zone", "chrono::NaiveDateTime"),
    ("timestamptz", "chrono::DateTime<chrono::Utc>"),
    ("timestamp with time zone", "chrono::DateTime<chrono::Utc>"),
    ("json", "serde_json::Value"),
    ("jsonb", "serde_json::Value"),
    ("bytea", "Vec<u8>"),
];

const FALLBACK_TYPE: &str = "String";

#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    overrides: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TypeMapFile {
    #[serde(default)]
    db_types: HashMap<String, String>,
}

impl TypeMap {
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        TypeMap {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Read the `[db_types]` table of a `type_map.toml`. A missing file
    /// yields the built-in table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let file: TypeMapFile = toml::from_str(&text)?;
        Ok(Self::with_overrides(file.db_types))
    }

    /// Rust type for a SQL type tag such as `integer`, `varchar(32)` or
    /// `int4[]`. Unknown tags map to `String`.
    pub fn rust_type(&self, tag: &str) -> String {
        let tag = tag.trim().to_lowercase();
        if let Some(inner) = tag.strip_suffix("[]") {
            return format!("Vec<{}>", self.rust_type(inner));
        }
        if let Some(ty) = self.overrides.get(&tag) {
            return ty.clone();
        }
        let base = match tag.find('(') {
            Some(idx) => tag[..idx].trim_end(),
            None => tag.as_str(),
        };
        if let Some(ty) = self.overrides.get(base) {
            return ty.clone();
        }
        SQL_TYPES
            .iter()
            .find(|(sql, _)| *sql == base)
            .map(|(_, rust)| rust.to_string())
            .unwrap_or_else(|| FALLBACK_TYPE.to_string())
    }
}
