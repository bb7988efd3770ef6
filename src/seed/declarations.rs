use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::seed::{SeedData, SeedRow, SeedTable, SeedValue};

const KEYWORDS: &[&str] = &["const", "let", "var"];

/// Parse seed declarations of the form
/// `const planets = [{ name: "Hoth", climate: "frozen" }];`.
///
/// Whitespace outside string literals is dropped, every `const`/`let`/`var`
/// starts a new declaration, bare keys are quoted and trailing commas removed
/// before the array is read as JSON.
pub fn parse_seed_declarations(text: &str) -> Result<SeedData> {
    let compact = compact(text)?;
    let mut lines = compact.split('\n');
    if let Some(leading) = lines.next() {
        if !leading.is_empty() {
            return Err(Error::seed_format(leading, "text outside a declaration"));
        }
    }

    let mut out = SeedData::new();
    for line in lines {
        let (table, rows) = parse_declaration(line)?;
        if out.contains_key(&table) {
            return Err(Error::seed_format(line, format!("`{}` is declared more than once", table)));
        }
        out.insert(table, rows);
    }
    Ok(out)
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)(?::[^=]*)?=(\[.*\])$").expect("valid regex"))
}

fn parse_declaration(line: &str) -> Result<(String, SeedTable)> {
    let Some(caps) = declaration_regex().captures(line) else {
        let reason = if line.contains('=') {
            "expected `name = [ ... ]`"
        } else {
            "missing assignment"
        };
        return Err(Error::seed_format(line, reason));
    };
    let table = caps[1].to_string();
    let json = jsonify(&caps[2]);
    let raw: Vec<IndexMap<String, serde_json::Value>> =
        serde_json::from_str(&json).map_err(|e| Error::seed_format(line, e.to_string()))?;

    let mut rows = SeedTable::with_capacity(raw.len());
    for (idx, fields) in raw.into_iter().enumerate() {
        let mut row = SeedRow::new();
        for (column, value) in fields {
            let value = match value {
                serde_json::Value::String(s) => SeedValue::Str(s),
                serde_json::Value::Bool(b) => SeedValue::Bool(b),
                serde_json::Value::Null => SeedValue::Null,
                serde_json::Value::Number(n) => number_value(&n),
                other => {
                    return Err(Error::seed_format(
                        line,
                        format!("row {} column `{}` is not a literal: {}", idx, column, other),
                    ))
                }
            };
            row.insert(column, value);
        }
        rows.push(row);
    }
    Ok((table, rows))
}

/// Integers outside `i64` and decimals that `f64` cannot reproduce keep
/// their source text.
fn number_value(n: &serde_json::Number) -> SeedValue {
    let text = n.to_string();
    if let Some(i) = n.as_i64() {
        return SeedValue::Int(i);
    }
    let exponent = text.contains(|c: char| c == 'e' || c == 'E');
    match n.as_f64() {
        Some(f) if !exponent && f.to_string() == text => SeedValue::Float(f),
        _ => SeedValue::Number(text),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Drop whitespace, comments, imports, `export` and `;` outside string literals,
/// rewrite every string as a double-quoted JSON string and put each
/// top-level declaration keyword on a fresh line.
fn compact(text: &str) -> Result<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '"' | '\'' | '`' => i = read_string(&chars, i, &mut out)?,
            '[' | '{' => {
                depth += 1;
                out.push(c);
                i += 1;
            }
            ']' | '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::seed_format(excerpt(&chars, i), "unbalanced brackets"))?;
                out.push(c);
                i += 1;
            }
            ';' if depth == 0 => i += 1,
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if depth == 0 && word == "import" {
                    while i < chars.len() && chars[i] != ';' && chars[i] != '\n' {
                        i += 1;
                    }
                } else if depth == 0 && KEYWORDS.contains(&word.as_str()) {
                    out.push('\n');
                } else if !(depth == 0 && word == "export") {
                    out.push_str(&word);
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    if depth != 0 {
        return Err(Error::seed_format(out.trim_start(), "unbalanced brackets"));
    }
    Ok(out)
}

/// Copy the string literal starting at `start` into `out` as a JSON string.
/// Returns the index just past its closing quote.
fn read_string(chars: &[char], start: usize, out: &mut String) -> Result<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let next = chars.get(i + 1).copied().unwrap_or('\\');
                match next {
                    '\'' | '`' => out.push(next),
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
                i += 2;
            }
            c if c == quote => {
                out.push('"');
                return Ok(i + 1);
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\n' | '\r' | '\t' => {
                out.push_str(match c {
                    '\n' => "\\n",
                    '\r' => "\\r",
                    _ => "\\t",
                });
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(Error::seed_format(excerpt(chars, start), "unterminated string literal"))
}

fn excerpt(chars: &[char], at: usize) -> String {
    chars[at..chars.len().min(at + 40)].iter().collect()
}

/// Quote bare object keys and drop trailing commas, leaving string
/// contents untouched.
fn jsonify(array: &str) -> String {
    let chars: Vec<char> = array.chars().collect();
    let mut out = String::with_capacity(array.len() + 16);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' {
                        if let Some(&next) = chars.get(i + 1) {
                            out.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if chars[i - 1] == '"' {
                        break;
                    }
                }
            }
            ',' if matches!(chars.get(i + 1), Some('}') | Some(']')) => i += 1,
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Render seed data back into declarations that
/// [`parse_seed_declarations`] reads unchanged.
pub fn render_seed_declarations(data: &SeedData) -> String {
    let mut out = String::new();
    for (table, rows) in data {
        out.push_str(&format!("const {} = [\n", table));
        for row in rows {
            let fields = row
                .iter()
                .map(|(column, value)| format!("{}: {}", column, render_value(value)))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("  {{ {} }},\n", fields));
        }
        out.push_str("];\n\n");
    }
    out
}

fn render_value(value: &SeedValue) -> String {
    let json = match value {
        SeedValue::Str(s) => serde_json::Value::from(s.as_str()),
        SeedValue::Int(i) => serde_json::Value::from(*i),
        SeedValue::Float(f) => serde_json::Value::from(*f),
        SeedValue::Bool(b) => serde_json::Value::from(*b),
        SeedValue::Null => serde_json::Value::Null,
        SeedValue::Number(text) => return text.clone(),
    };
    json.to_string()
}
