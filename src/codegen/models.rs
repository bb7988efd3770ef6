use std::collections::{HashMap, HashSet};

use crate::ir::{ColumnMetadata, Schema, TableMetadata};
use crate::type_map::TypeMap;

const HEADER: &str = "// @generated by `pgmodel pull`. Do not edit by hand.\n\
#![allow(non_snake_case, non_camel_case_types, unused_imports)]\n\n\
use pgmodel::{Association, ColumnMetadata, Model, TableMetadata};\n\n";

/// Names brought into scope by `HEADER`.
const IMPORTED: &[&str] = &["Association", "ColumnMetadata", "Model", "TableMetadata"];

/// Rust type names for every table struct and enum. Tables are named
/// first; an enum whose name is taken gets an `Enum` suffix, and any
/// remaining clash a numeric one.
struct TypeNames {
    structs: Vec<String>,
    enums: HashMap<String, String>,
}

impl TypeNames {
    fn new(schema: &Schema) -> Self {
        let mut taken: HashSet<String> = IMPORTED.iter().map(|s| s.to_string()).collect();
        let structs = schema
            .tables
            .keys()
            .map(|table| claim(&mut taken, struct_name(table), ""))
            .collect();
        let enums = schema
            .enums
            .keys()
            .map(|name| (name.clone(), claim(&mut taken, enum_type_name(name), "Enum")))
            .collect();
        TypeNames { structs, enums }
    }

    fn enum_name(&self, name: &str) -> String {
        self.enums
            .get(name)
            .cloned()
            .unwrap_or_else(|| enum_type_name(name))
    }
}

/// `base` if it is free, else `base` + `suffix`, then numbered variants.
fn claim(taken: &mut HashSet<String>, base: String, suffix: &str) -> String {
    let mut name = base.clone();
    if taken.contains(&name) && !suffix.is_empty() {
        name = format!("{}{}", base, suffix);
    }
    let stem = name.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}{}", stem, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}

/// Render one model struct plus `impl Model` per table and one Rust enum
/// per database enum, in the schema's insertion order.
pub fn generate_models(schema: &Schema, types: &TypeMap) -> String {
    let names = TypeNames::new(schema);
    let mut out = String::from(HEADER);
    for ((table, columns), ident) in schema.tables.iter().zip(&names.structs) {
        out.push_str(&generate_model_struct(ident, columns, types, &names));
        out.push_str(&generate_model_impl(ident, table, columns));
    }
    for (name, labels) in &schema.enums {
        out.push_str(&generate_enum(&names.enum_name(name), name, labels));
    }
    out
}

fn generate_model_struct(
    ident: &str,
    columns: &TableMetadata,
    types: &TypeMap,
    names: &TypeNames,
) -> String {
    let mut out = String::from("#[derive(Debug, Clone, sqlx::FromRow)]\n");
    out.push_str(&format!("pub struct {} {{\n", ident));
    let mut taken = HashSet::new();
    for (column, meta) in columns {
        let field = field_name(&mut taken, column);
        if field != *column {
            out.push_str(&format!("    #[sqlx(rename = {:?})]\n", column));
        }
        let mut rust_type = match meta.enum_name() {
            Some(name) => names.enum_name(name),
            None => types.rust_type(meta.type_tag()),
        };
        if !meta.not_null && !meta.primary_key {
            rust_type = format!("Option<{}>", rust_type);
        }
        out.push_str(&format!("    pub {}: {},\n", field, rust_type));
    }
    out.push_str("}\n\n");
    out
}

fn generate_model_impl(ident: &str, table: &str, columns: &TableMetadata) -> String {
    let mut out = format!("impl Model for {} {{\n", ident);
    out.push_str(&format!("    const TABLE: &'static str = {:?};\n\n", table));
    out.push_str("    fn columns() -> TableMetadata {\n        [\n");
    for (column, meta) in columns {
        out.push_str(&format!(
            "            ({:?}, {}),\n",
            column,
            column_builder(meta)
        ));
    }
    out.push_str("        ]\n        .into_iter()\n        .collect()\n    }\n}\n\n");
    out
}

/// Builder expression for one column, one call per present property.
fn column_builder(meta: &ColumnMetadata) -> String {
    let mut expr = match meta.enum_name() {
        Some(name) => format!("ColumnMetadata::enumeration({:?})", name),
        None => format!("ColumnMetadata::sql({:?})", meta.type_tag()),
    };
    if meta.not_null {
        expr.push_str(".not_null(true)");
    } else if !meta.is_enum() {
        expr.push_str(".not_null(false)");
    }
    if let Some(length) = meta.length {
        expr.push_str(&format!(".length({})", length));
    }
    if meta.auto_increment {
        expr.push_str(".auto_increment()");
    }
    if let Some(default) = &meta.default_val {
        expr.push_str(&format!(".default_val({:?})", default));
    }
    if meta.primary_key {
        expr.push_str(".primary_key()");
    }
    if meta.unique {
        expr.push_str(".unique()");
    }
    for (name, conditions) in &meta.checks {
        if conditions.is_empty() {
            expr.push_str(&format!(".check({:?}, Vec::<&str>::new())", name));
        } else {
            expr.push_str(&format!(".check({:?}, {:?})", name, conditions));
        }
    }
    if let Some(assoc) = &meta.association {
        expr.push_str(&format!(
            ".association(Association::new({:?}, {:?}, {:?}))",
            assoc.name, assoc.mapped_table, assoc.mapped_column
        ));
    }
    expr
}

fn generate_enum(ident: &str, name: &str, labels: &[String]) -> String {
    let mut out = String::from("#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]\n");
    out.push_str(&format!("#[sqlx(type_name = {:?})]\n", name));
    out.push_str(&format!("pub enum {} {{\n", ident));
    let mut seen = HashSet::new();
    for (idx, label) in labels.iter().enumerate() {
        let mut variant = variant_name(label);
        if !seen.insert(variant.clone()) {
            variant = format!("{}{}", variant, idx);
            seen.insert(variant.clone());
        }
        out.push_str(&format!("    #[sqlx(rename = {:?})]\n", label));
        out.push_str(&format!("    {},\n", variant));
    }
    out.push_str("}\n\n");
    out
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

fn escape_rust_keyword(name: &str) -> String {
    match name {
        // Not allowed as raw identifiers.
        "crate" | "self" | "Self" | "super" => format!("{}_", name),
        _ if RUST_KEYWORDS.contains(&name) => format!("r#{}", name),
        _ => name.to_string(),
    }
}

/// Sanitized, keyword-escaped field name; a clash with an earlier field
/// of the same struct is numbered `_2`, `_3`, ...
fn field_name(taken: &mut HashSet<String>, column: &str) -> String {
    let base = sanitize_ident(column);
    let mut field = escape_rust_keyword(&base);
    let mut n = 2;
    while !taken.insert(field.clone()) {
        field = escape_rust_keyword(&format!("{}_{}", base, n));
        n += 1;
    }
    field
}

/// Replace anything that cannot appear in an identifier with `_`.
fn sanitize_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

fn struct_name(table: &str) -> String {
    let name = pascal_case(&sanitize_ident(table));
    let first = name.chars().next();
    match first {
        Some(c) if !c.is_ascii_digit() && name != "Self" => name,
        _ => format!("Table{}", name),
    }
}

fn enum_type_name(name: &str) -> String {
    capitalize(&sanitize_ident(name))
}

fn variant_name(label: &str) -> String {
    let name = pascal_case(&sanitize_ident(label));
    let first = name.chars().next();
    match first {
        Some(c) if !c.is_ascii_digit() && name != "Self" => name,
        _ => format!("V{}", name),
    }
}

/// Upper-case the first character only: `climate_type` -> `Climate_type`.
pub fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

pub fn pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut c = p.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_ascii_uppercase().to_string() + c.as_str(),
            }
        })
        .collect()
}
