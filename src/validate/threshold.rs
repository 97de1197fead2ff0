use async_trait::async_trait;

use super::ComplianceValidator;
use crate::error::ProviderResult;
use crate::report::ComplianceResult;
use crate::rules::RuleContext;
use crate::semantic::thresholds;
use crate::types::ClauseKind;

/// Compliant when the best rule is at least `threshold` similar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdValidator {
    threshold: f32,
}

impl ThresholdValidator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn judge(&self, clause: ClauseKind, context: &RuleContext) -> ComplianceResult {
        let max_similarity = context.max_similarity();
        let matched_rule = context.best_match().map(|m| m.rule_id.clone());

        let result = if max_similarity.is_nan() || max_similarity < self.threshold {
            ComplianceResult::non_compliant(vec![format!(
                "Clause '{clause}' has low similarity to reference rules (max similarity: {max_similarity:.2})"
            )])
        } else {
            ComplianceResult::compliant()
        };
        result.with_matched_rule(matched_rule)
    }
}

impl Default for ThresholdValidator {
    fn default() -> Self {
        Self::new(thresholds::DEFAULT)
    }
}

#[async_trait]
impl ComplianceValidator for ThresholdValidator {
    async fn validate(
        &self,
        clause: ClauseKind,
        _clause_text: &str,
        context: &RuleContext,
    ) -> ProviderResult<ComplianceResult> {
        Ok(self.judge(clause, context))
    }

    fn name(&self) -> &'static str {
        "threshold"
    }

    fn needs_ranked_context(&self) -> bool {
        true
    }
}
