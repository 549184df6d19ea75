//! Parse form definitions from JSON text, JSON values, or files.

use std::path::Path;

use serde_json::Value;

use crate::error::{FormError, Result};
use crate::types::FormDefinition;

/// Parse a form definition from a JSON string.
pub fn parse_json(content: &str) -> Result<FormDefinition> {
    serde_json::from_str(content).map_err(|e| FormError::Parse(e.to_string()))
}

/// Parse a form definition from an already decoded JSON value.
///
/// Accepts either the definition object itself or an engine envelope that
/// wraps it under `schema`.
pub fn parse_value(value: &Value) -> Result<FormDefinition> {
    let body = match value.get("schema") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    FormDefinition::deserialize_from(body)
}

/// Load a form definition from a file path.
pub fn load_definition(path: &Path) -> Result<FormDefinition> {
    let content = std::fs::read_to_string(path)?;
    let value: Value =
        serde_json::from_str(&content).map_err(|e| FormError::Parse(e.to_string()))?;
    let mut definition = parse_value(&value)?;
    definition.source = path.display().to_string();
    Ok(definition)
}

impl FormDefinition {
    fn deserialize_from(value: &Value) -> Result<Self> {
        use serde::Deserialize;
        Self::deserialize(value).map_err(|e| FormError::Parse(e.to_string()))
    }
}
