//! Typed decoding of structured model output.

use serde::de::DeserializeOwned;

use super::JsonSchema;
use crate::error::ParseError;

/// Decode `raw` as JSON and check that every key the schema requires is present.
pub fn parse_structured_value(
    raw: &str,
    schema: &JsonSchema,
) -> Result<serde_json::Value, ParseError> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or_else(|| ParseError::SchemaMismatch {
        schema: schema.name.clone(),
        reason: "expected a JSON object".to_string(),
    })?;

    if let Some(missing) = schema
        .required_keys()
        .into_iter()
        .find(|key| !object.contains_key(*key))
    {
        return Err(ParseError::SchemaMismatch {
            schema: schema.name.clone(),
            reason: format!("missing required key '{missing}'"),
        });
    }

    Ok(value)
}

/// Decode `raw` into `T` after the required-key check.
pub fn parse_structured<T: DeserializeOwned>(
    raw: &str,
    schema: &JsonSchema,
) -> Result<T, ParseError> {
    let value = parse_structured_value(raw, schema)?;
    serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch {
        schema: schema.name.clone(),
        reason: e.to_string(),
    })
}

/// Some deployments wrap JSON in a markdown fence despite `json_schema`.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}
