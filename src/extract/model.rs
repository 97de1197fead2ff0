//! Language-model extraction in one structured request.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::ClauseExtractor;
use crate::documents::{Chunk, Document};
use crate::error::{ParseError, ProviderResult};
use crate::llm::{CompletionClient, JsonSchema, parse_structured_value};
use crate::types::{ClauseKind, ClauseMap, PARSING_FAILED};

pub const CLAUSES_SCHEMA_NAME: &str = "mou_clauses";

const SYSTEM_PROMPT: &str = "Extract legal clauses from MOU.";

/// Object schema with one required string property per clause.
pub fn clauses_schema() -> JsonSchema {
    let properties: Map<String, Value> = ClauseKind::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), json!({"type": "string"})))
        .collect();
    let required: Vec<&str> = ClauseKind::ALL.iter().map(|k| k.as_str()).collect();

    JsonSchema::new(
        CLAUSES_SCHEMA_NAME,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        }),
    )
}

/// Asks the model for every clause at once.
pub struct ModelClauseExtractor {
    client: Arc<dyn CompletionClient>,
    schema: JsonSchema,
}

impl ModelClauseExtractor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            schema: clauses_schema(),
        }
    }

    /// Decode a model answer; any defect fails the whole map.
    pub fn decode(&self, raw: &str) -> Result<ClauseMap, ParseError> {
        let value = parse_structured_value(raw, &self.schema)?;

        let mut entries = Vec::with_capacity(ClauseKind::ALL.len());
        for kind in ClauseKind::ALL {
            let text = value
                .get(kind.as_str())
                .and_then(Value::as_str)
                .ok_or_else(|| ParseError::SchemaMismatch {
                    schema: self.schema.name.clone(),
                    reason: format!("'{kind}' is not a string"),
                })?;
            entries.push((kind, text.to_string()));
        }

        Ok(ClauseMap::from_partial(entries, PARSING_FAILED))
    }
}

#[async_trait]
impl ClauseExtractor for ModelClauseExtractor {
    async fn extract(&self, document: &Document, _chunks: &[Chunk]) -> ProviderResult<ClauseMap> {
        let raw = self
            .client
            .complete(SYSTEM_PROMPT, document.text(), &self.schema)
            .await?;

        Ok(self.decode(&raw).unwrap_or_else(|e| {
            tracing::warn!(target: "extract", "clause extraction output rejected: {e}");
            ClauseMap::filled(PARSING_FAILED)
        }))
    }

    fn name(&self) -> &'static str {
        "model"
    }
}
