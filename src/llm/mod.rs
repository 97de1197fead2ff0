//! Language-model structured completion.
//!
//! A [`CompletionClient`] sends a system prompt, a user prompt and a JSON
//! schema, and returns the raw text the model produced. The text is *not*
//! trusted: callers decode it with [`parse_structured`] and decide their own
//! fallback when decoding fails.

mod azure;
mod structured;

pub use azure::AzureOpenAiClient;
pub use structured::{parse_structured, parse_structured_value};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ProviderResult;

/// A named JSON schema for `response_format: json_schema`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl JsonSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Keys listed under `required`.
    pub fn required_keys(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|keys| keys.iter().filter_map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Chat completion constrained by a JSON schema.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the model's message content verbatim.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &JsonSchema,
    ) -> ProviderResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_keys() {
        let schema = JsonSchema::new(
            "example",
            json!({"type": "object", "required": ["status", "issues"]}),
        );
        assert_eq!(schema.required_keys(), vec!["status", "issues"]);

        let open = JsonSchema::new("open", json!({"type": "object"}));
        assert!(open.required_keys().is_empty());
    }
}
