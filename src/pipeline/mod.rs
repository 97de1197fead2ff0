//! Compliance pipeline
//!
//! Runs one document through every stage and produces one report.
//!
//! ## Architecture
//!
//! ```text
//! SEGMENT → EXTRACT → (per clause) RETRIEVE → VALIDATE → AGGREGATE
//!    │         │                     │           │           │
//!    ▼         ▼                     ▼           ▼           ▼
//! [chunks] [ClauseMap]         [RuleContext] [verdict]   [report]
//! ```
//!
//! Clauses are processed one after another in canonical order. Provider
//! calls are retried per [`RetryPolicy`]; a call that still fails either
//! aborts the run (`fail_fast`) or degrades to a non-compliant verdict.
//!
//! ## Usage
//!
//! ```ignore
//! let pipeline = CompliancePipeline::from_settings(&settings).await?;
//! let report = pipeline.run(&document).await?;
//! ```

mod builder;
mod types;

pub use builder::{
    embedder_from_settings, load_rules_for_embedding, load_rules_for_keyword, rebuild_rule_cache,
};
pub use types::{ClauseOutcome, PipelineError, PipelineResult, RunOutcome};

use std::collections::BTreeMap;
use std::time::Instant;

use crate::documents::{Chunker, Document, WordChunker};
use crate::error::ProviderError;
use crate::extract::ClauseExtractor;
use crate::report::{ComplianceReport, ComplianceResult, aggregate};
use crate::retry::RetryPolicy;
use crate::rules::{RuleContext, RuleStore};
use crate::types::{ClauseKind, ClauseMap, PARSING_FAILED};
use crate::validate::ComplianceValidator;

/// The configured chain of extractor, rule store and validator.
pub struct CompliancePipeline {
    chunker: WordChunker,
    extractor: Box<dyn ClauseExtractor>,
    rules: RuleStore,
    validator: Box<dyn ComplianceValidator>,
    retry: RetryPolicy,
    fail_fast: bool,
}

impl std::fmt::Debug for CompliancePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompliancePipeline")
            .field("chunk_size", &self.chunker.chunk_size())
            .field("extractor", &self.extractor.name())
            .field("retrieval", &self.rules.mode())
            .field("validator", &self.validator.name())
            .field("retry", &self.retry)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl CompliancePipeline {
    /// Combine the three strategies.
    ///
    /// Fails when the validator needs similarity scores that the rule store
    /// cannot provide.
    pub fn new(
        extractor: Box<dyn ClauseExtractor>,
        rules: RuleStore,
        validator: Box<dyn ComplianceValidator>,
    ) -> PipelineResult<Self> {
        if validator.needs_ranked_context() && !matches!(rules, RuleStore::Embedding(_)) {
            return Err(PipelineError::Config(format!(
                "{} validation needs embedding retrieval, got {} retrieval",
                validator.name(),
                rules.mode()
            )));
        }

        Ok(Self {
            chunker: WordChunker::default(),
            extractor,
            rules,
            validator,
            retry: RetryPolicy::default(),
            fail_fast: false,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> PipelineResult<Self> {
        self.chunker = WordChunker::new(chunk_size)?;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Check a document and return the report.
    pub async fn run(&self, document: &Document) -> PipelineResult<ComplianceReport> {
        Ok(self.run_detailed(document).await?.report)
    }

    /// Check a document and return every intermediate result.
    pub async fn run_detailed(&self, document: &Document) -> PipelineResult<RunOutcome> {
        let start = Instant::now();
        crate::log_event!(
            "pipeline",
            "started",
            "{} ({} words)",
            document.source(),
            document.word_count()
        );

        let chunks = self.chunker.chunk(document.text())?;
        crate::debug_event!("pipeline", "segmented", "{} chunks", chunks.len());

        let clauses = self.extract(document, &chunks).await?;

        let mut outcomes = Vec::with_capacity(ClauseKind::ALL.len());
        for (clause, text) in clauses.iter() {
            let result = self.check_clause(clause, text).await?;
            crate::debug_event!(
                "pipeline",
                "verdict",
                "{clause}: {} (rule: {})",
                result.status,
                result.matched_rule.as_deref().unwrap_or("-")
            );
            outcomes.push(ClauseOutcome {
                clause,
                text: text.to_string(),
                result,
            });
        }

        let results: BTreeMap<ClauseKind, ComplianceResult> = outcomes
            .iter()
            .map(|o| (o.clause, o.result.clone()))
            .collect();
        let report = aggregate(&results);

        crate::log_event!(
            "pipeline",
            "finished",
            "{} with {} findings in {:.2?}",
            report.compliance_status,
            report.findings.len(),
            start.elapsed()
        );

        Ok(RunOutcome {
            clauses,
            outcomes,
            report,
        })
    }

    async fn extract(
        &self,
        document: &Document,
        chunks: &[crate::documents::Chunk],
    ) -> PipelineResult<ClauseMap> {
        let extracted = self
            .retry
            .run("clause extraction", || self.extractor.extract(document, chunks))
            .await;

        match extracted {
            Ok(clauses) => Ok(clauses),
            Err(e) => self.degrade(e, "clause extraction").map(|_| ClauseMap::filled(PARSING_FAILED)),
        }
    }

    async fn check_clause(&self, clause: ClauseKind, text: &str) -> PipelineResult<ComplianceResult> {
        let context = match self
            .retry
            .run("rule retrieval", || self.rules.retrieve(clause, text))
            .await
        {
            Ok(context) => context,
            Err(e) => return self.degrade_clause(clause, e, "rule retrieval"),
        };

        if let RuleContext::Ranked(matches) = &context {
            crate::debug_event!(
                "pipeline",
                "retrieved",
                "{} rules for {clause}, best {:.3}",
                matches.len(),
                context.max_similarity()
            );
        }

        match self
            .retry
            .run("clause validation", || {
                self.validator.validate(clause, text, &context)
            })
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => self.degrade_clause(clause, e, "clause validation"),
        }
    }

    /// Abort under `fail_fast`, otherwise log and continue.
    fn degrade(&self, error: ProviderError, stage: &str) -> PipelineResult<()> {
        if self.fail_fast {
            return Err(PipelineError::Provider(error));
        }
        tracing::warn!(target: "pipeline", "{stage} failed, continuing with fallback: {error}");
        Ok(())
    }

    fn degrade_clause(
        &self,
        clause: ClauseKind,
        error: ProviderError,
        stage: &str,
    ) -> PipelineResult<ComplianceResult> {
        let issue = format!("Provider error: {error}");
        self.degrade(error, &format!("{stage} for '{clause}'"))?;
        Ok(ComplianceResult::non_compliant(vec![issue]))
    }
}
