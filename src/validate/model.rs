//! Language-model validation of a clause against rule text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::ComplianceValidator;
use crate::error::ProviderResult;
use crate::llm::{CompletionClient, JsonSchema, parse_structured};
use crate::report::ComplianceResult;
use crate::rules::RuleContext;
use crate::types::ClauseKind;

pub const COMPLIANCE_SCHEMA_NAME: &str = "compliance_result";

const SYSTEM_PROMPT: &str = "You are a legal compliance validator.";

pub fn compliance_schema() -> JsonSchema {
    JsonSchema::new(
        COMPLIANCE_SCHEMA_NAME,
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["Compliant", "Non-compliant"]},
                "issues": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["status", "issues"],
            "additionalProperties": false,
        }),
    )
}

/// Asks the model for a verdict on one clause.
///
/// Answers that cannot be decoded become a non-compliant "Parsing failed"
/// verdict, never a compliant one.
pub struct ModelValidator {
    client: Arc<dyn CompletionClient>,
    schema: JsonSchema,
    context_rules: usize,
}

impl ModelValidator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            schema: compliance_schema(),
            context_rules: 1,
        }
    }

    /// How many ranked rules go into the prompt.
    pub fn with_context_rules(mut self, context_rules: usize) -> Self {
        self.context_rules = context_rules.max(1);
        self
    }

    pub fn user_prompt(rule: &str, clause: &str) -> String {
        format!("Rule:\n{rule}\n\nClause:\n{clause}")
    }
}

#[async_trait]
impl ComplianceValidator for ModelValidator {
    async fn validate(
        &self,
        clause: ClauseKind,
        clause_text: &str,
        context: &RuleContext,
    ) -> ProviderResult<ComplianceResult> {
        let prompt = Self::user_prompt(&context.prompt_text(self.context_rules), clause_text);
        let raw = self.client.complete(SYSTEM_PROMPT, &prompt, &self.schema).await?;

        let result = parse_structured::<ComplianceResult>(&raw, &self.schema).unwrap_or_else(|e| {
            tracing::warn!(target: "validate", "verdict for '{clause}' rejected: {e}");
            ComplianceResult::parsing_failed()
        });

        Ok(result.with_matched_rule(context.best_match().map(|m| m.rule_id.clone())))
    }

    fn name(&self) -> &'static str {
        "model"
    }
}
