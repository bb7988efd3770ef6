use crate::error::{Error, Result};
use crate::seed::{SeedData, SeedRow, SeedTable, SeedValue};

/// Parse a TOML seed manifest where every table is an array of tables:
///
/// ```toml
/// [[planets]]
/// name = "Hoth"
/// climate = "frozen"
/// ```
pub fn parse_seed_manifest(text: &str) -> Result<SeedData> {
    let doc: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| Error::seed_format("<seed manifest>", e.to_string()))?;

    let mut out = SeedData::new();
    for (table, value) in doc {
        let declaration = format!("[[{}]]", table);
        let toml::Value::Array(items) = value else {
            return Err(Error::seed_format(
                declaration,
                "expected an array of tables",
            ));
        };
        let mut rows = SeedTable::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let toml::Value::Table(fields) = item else {
                return Err(Error::seed_format(
                    declaration,
                    format!("row {} is not a table", idx),
                ));
            };
            let mut row = SeedRow::new();
            for (column, value) in fields {
                let value = match value {
                    toml::Value::String(s) => SeedValue::Str(s),
                    toml::Value::Integer(i) => SeedValue::Int(i),
                    toml::Value::Float(f) => SeedValue::Float(f),
                    toml::Value::Boolean(b) => SeedValue::Bool(b),
                    toml::Value::Datetime(dt) => SeedValue::Str(dt.to_string()),
                    other => {
                        return Err(Error::seed_format(
                            declaration,
                            format!("row {} column `{}` is not a scalar: {}", idx, column, other),
                        ))
                    }
                };
                row.insert(column, value);
            }
            rows.push(row);
        }
        out.insert(table, rows);
    }
    Ok(out)
}
