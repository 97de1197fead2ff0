//! End-to-end pipeline runs with a fixed embedder.

use std::sync::Arc;

use async_trait::async_trait;
use clausewise::extract::MarkerClauseExtractor;
use clausewise::rules::{EmbeddingRuleStore, Rule, RuleStore};
use clausewise::semantic::EmbeddingProvider;
use clausewise::validate::ThresholdValidator;
use clausewise::{ComplianceStatus, CompliancePipeline, Document, ProviderResult};

/// Places texts at fixed angles from the single rule vector `[1, 0]`.
struct AngleEmbedder;

impl AngleEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let cos: f32 = if lower.contains("not found") {
            0.0
        } else if lower.contains("purpose") {
            0.9
        } else if lower.contains("confidential") {
            0.2
        } else {
            1.0
        };
        vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
    }
}

#[async_trait]
impl EmbeddingProvider for AngleEmbedder {
    fn model_id(&self) -> &str {
        "angle"
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

async fn threshold_pipeline() -> CompliancePipeline {
    let rules = vec![Rule::new("rule-0", "Reference rule").with_embedding(vec![1.0, 0.0])];
    let store = EmbeddingRuleStore::new(rules, Arc::new(AngleEmbedder))
        .await
        .unwrap();

    CompliancePipeline::new(
        Box::new(MarkerClauseExtractor::default()),
        RuleStore::Embedding(store),
        Box::new(ThresholdValidator::default()),
    )
    .unwrap()
    .with_chunk_size(4)
    .unwrap()
}

#[tokio::test]
async fn test_low_similarity_clause_is_the_only_finding() {
    let pipeline = threshold_pipeline().await;
    let document = Document::new(
        "mou.txt",
        "The purpose is research. Each party's responsibilities apply. \
         Keep confidential data safe. Either party may terminate.",
    );

    let report = pipeline.run(&document).await.unwrap();

    assert_eq!(report.compliance_status, ComplianceStatus::NonCompliant);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].clause, "confidentiality");
    assert_eq!(
        report.findings[0].issues,
        vec![
            "Clause 'confidentiality' has low similarity to reference rules (max similarity: 0.20)"
                .to_string()
        ]
    );

    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty()).unwrap();
    assert_eq!(json["compliance_status"], "Non-compliant");
}

#[tokio::test]
async fn test_empty_document_reports_every_clause_in_order() {
    let pipeline = threshold_pipeline().await;

    let outcome = pipeline
        .run_detailed(&Document::new("empty.txt", ""))
        .await
        .unwrap();

    assert!(outcome.clauses.iter().all(|(_, text)| text == "Not found"));
    let clauses: Vec<&str> = outcome
        .report
        .findings
        .iter()
        .map(|f| f.clause.as_str())
        .collect();
    assert_eq!(
        clauses,
        vec![
            "purpose",
            "parties_responsibilities",
            "confidentiality",
            "term_termination"
        ]
    );
    assert!(!outcome.report.is_compliant());
}

#[tokio::test]
async fn test_missing_clause_is_validated_as_not_found() {
    let pipeline = threshold_pipeline().await;
    let document = Document::new(
        "mou.txt",
        "Our purpose is training. Partner responsibilities are shared. Termination needs notice.",
    );

    let outcome = pipeline.run_detailed(&document).await.unwrap();

    let confidentiality = &outcome.outcomes[2];
    assert_eq!(confidentiality.text, "Not found");
    assert_eq!(confidentiality.result.status, ComplianceStatus::NonCompliant);
    assert_eq!(outcome.report.findings.len(), 1);
    assert_eq!(outcome.report.findings[0].clause, "confidentiality");
}
