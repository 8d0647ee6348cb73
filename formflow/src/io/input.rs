//! Field values supplied from files or the command line.
//!
//! Input files are flat TOML or JSON objects mapping field names to values.
//! Scalars are stringified the way a text input would hold them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::types::FieldValues;

/// Load field values from `path`, picking the format by extension
/// (`.json`, otherwise TOML).
pub fn load_values(path: &Path) -> Result<FieldValues> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json_values(&contents).with_context(|| format!("parse {}", path.display()))
    } else {
        parse_toml_values(&contents).with_context(|| format!("parse {}", path.display()))
    }
}

pub fn parse_toml_values(contents: &str) -> Result<FieldValues> {
    let table: toml::Table = toml::from_str(contents)?;
    table
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => bail!("field '{name}' must be a scalar, got {}", other.type_str()),
            };
            Ok((name, value))
        })
        .collect()
}

pub fn parse_json_values(contents: &str) -> Result<FieldValues> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(contents)?;
    object
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => String::new(),
                _ => bail!("field '{name}' must be a scalar"),
            };
            Ok((name, value))
        })
        .collect()
}

/// Parse a `name=value` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("field name must not be empty in '{raw}'");
    }
    Ok((name.to_string(), value.to_string()))
}
