use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::query::Model;

/// Column type: either a concrete SQL type tag or a named database enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Sql(String),
    Enum(String),
}

/// Foreign key from a column to another table's column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub name: String,
    pub mapped_table: String,
    pub mapped_column: String,
}

impl Association {
    pub fn new(
        name: impl Into<String>,
        mapped_table: impl Into<String>,
        mapped_column: impl Into<String>,
    ) -> Self {
        Association {
            name: name.into(),
            mapped_table: mapped_table.into(),
            mapped_column: mapped_column.into(),
        }
    }
}

/// Everything known about one column. Unset flags and empty collections
/// mean the property is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumn", into = "RawColumn")]
pub struct ColumnMetadata {
    pub column_type: ColumnType,
    pub not_null: bool,
    pub length: Option<u32>,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default_val: Option<String>,
    /// Check constraint name to the conditions conjoined under it.
    pub checks: IndexMap<String, Vec<String>>,
    pub association: Option<Association>,
}

impl ColumnMetadata {
    fn with_type(column_type: ColumnType) -> Self {
        ColumnMetadata {
            column_type,
            not_null: false,
            length: None,
            auto_increment: false,
            primary_key: false,
            unique: false,
            default_val: None,
            checks: IndexMap::new(),
            association: None,
        }
    }

    pub fn sql(tag: impl Into<String>) -> Self {
        Self::with_type(ColumnType::Sql(tag.into()))
    }

    pub fn enumeration(enum_name: impl Into<String>) -> Self {
        Self::with_type(ColumnType::Enum(enum_name.into()))
    }

    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_val(mut self, expr: impl Into<String>) -> Self {
        self.default_val = Some(expr.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn check<I, S>(mut self, name: impl Into<String>, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checks
            .entry(name.into())
            .or_default()
            .extend(conditions.into_iter().map(Into::into));
        self
    }

    pub fn association(mut self, association: Association) -> Self {
        self.association = Some(association);
        self
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.column_type, ColumnType::Enum(_))
    }

    pub fn enum_name(&self) -> Option<&str> {
        match &self.column_type {
            ColumnType::Enum(name) => Some(name),
            ColumnType::Sql(_) => None,
        }
    }

    /// The type tag as stored in the manifest (`"enum"` for enum columns).
    pub fn type_tag(&self) -> &str {
        match &self.column_type {
            ColumnType::Sql(tag) => tag,
            ColumnType::Enum(_) => "enum",
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawColumn {
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_val: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    unique: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    checks: IndexMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    association: Option<Association>,
}

impl TryFrom<RawColumn> for ColumnMetadata {
    type Error = String;

    fn try_from(raw: RawColumn) -> std::result::Result<Self, Self::Error> {
        let column_type = match (raw.column_type.as_str(), raw.enum_name) {
            ("enum", Some(name)) if !name.is_empty() => ColumnType::Enum(name),
            ("enum", _) => return Err("column of type `enum` must set `enumName`".into()),
            (_, Some(name)) => {
                return Err(format!(
                    "column of type `{}` cannot set `enumName` ({})",
                    raw.column_type, name
                ))
            }
            ("", None) => return Err("column type must not be empty".into()),
            (tag, None) => ColumnType::Sql(tag.to_string()),
        };
        Ok(ColumnMetadata {
            column_type,
            not_null: raw.not_null,
            length: raw.length,
            auto_increment: raw.auto_increment,
            primary_key: raw.primary_key,
            unique: raw.unique,
            default_val: raw.default_val,
            checks: raw.checks,
            association: raw.association,
        })
    }
}

impl From<ColumnMetadata> for RawColumn {
    fn from(col: ColumnMetadata) -> Self {
        let (column_type, enum_name) = match col.column_type {
            ColumnType::Sql(tag) => (tag, None),
            ColumnType::Enum(name) => ("enum".to_string(), Some(name)),
        };
        RawColumn {
            column_type,
            enum_name,
            not_null: col.not_null,
            length: col.length,
            auto_increment: col.auto_increment,
            default_val: col.default_val,
            primary_key: col.primary_key,
            unique: col.unique,
            checks: col.checks,
            association: col.association,
        }
    }
}

/// Ordered column name to metadata mapping for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMetadata(IndexMap<String, ColumnMetadata>);

impl TableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, column: ColumnMetadata) {
        self.0.insert(name.into(), column);
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMetadata> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.0.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ColumnMetadata> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ColumnMetadata)> for TableMetadata {
    fn from_iter<T: IntoIterator<Item = (K, ColumnMetadata)>>(iter: T) -> Self {
        TableMetadata(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a> IntoIterator for &'a TableMetadata {
    type Item = (&'a String, &'a ColumnMetadata);
    type IntoIter = indexmap::map::Iter<'a, String, ColumnMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Enum type name to its labels in declared order.
pub type EnumMetadata = IndexMap<String, Vec<String>>;

/// A complete snapshot of modeled tables and enum types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: IndexMap<String, TableMetadata>,
    #[serde(default)]
    pub enums: EnumMetadata,
}

impl Schema {
    /// Add a compiled model definition.
    pub fn register<M: Model>(&mut self) -> &mut Self {
        self.tables.insert(M::TABLE.to_string(), M::columns());
        self
    }

    pub fn table_names(&self) -> HashSet<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidSchema(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a models manifest written by `pgmodel pull --manifest`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::InvalidSchema(format!("{}: {}", path.display(), e)))
    }
}
