//! Per-clause compliance decisions.

mod model;
mod threshold;

pub use model::{COMPLIANCE_SCHEMA_NAME, ModelValidator, compliance_schema};
pub use threshold::ThresholdValidator;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::report::ComplianceResult;
use crate::rules::RuleContext;
use crate::types::ClauseKind;

/// Decides whether one clause complies with the retrieved rules.
#[async_trait]
pub trait ComplianceValidator: Send + Sync {
    async fn validate(
        &self,
        clause: ClauseKind,
        clause_text: &str,
        context: &RuleContext,
    ) -> ProviderResult<ComplianceResult>;

    fn name(&self) -> &'static str;

    /// Whether this validator needs similarity scores from retrieval.
    fn needs_ranked_context(&self) -> bool {
        false
    }
}
