//! Wiring a pipeline from [`Settings`].

use std::path::Path;
use std::sync::Arc;

use super::{CompliancePipeline, PipelineError, PipelineResult};
use crate::config::{
    EmbeddingBackend, ExtractionMode, RetrievalMode, SearchBackend, Settings, ValidationMode,
};
use crate::error::ProviderResult;
use crate::extract::{ClauseExtractor, MarkerClauseExtractor, ModelClauseExtractor};
use crate::llm::{AzureOpenAiClient, CompletionClient};
use crate::rules::{
    self, AzureSearchClient, EmbeddingRuleStore, KeywordRuleStore, LocalRuleIndex, Rule,
    RuleStore, SearchService, cache,
};
use crate::semantic::{
    AzureEmbeddingProvider, EmbeddingProvider, FastEmbedProvider, HashingEmbeddingProvider,
};
use crate::validate::{ComplianceValidator, ModelValidator, ThresholdValidator};

/// The embedding backend named in the settings.
pub fn embedder_from_settings(settings: &Settings) -> ProviderResult<Arc<dyn EmbeddingProvider>> {
    let config = &settings.embeddings;
    Ok(match config.backend {
        EmbeddingBackend::Fastembed => Arc::new(FastEmbedProvider::new(
            &config.model,
            config.cache_dir.as_ref().map(|dir| settings.resolve_path(dir)),
            config.show_progress,
        )?),
        EmbeddingBackend::Azure => Arc::new(AzureEmbeddingProvider::new(
            &settings.llm.endpoint,
            &settings.llm.api_key,
            &config.api_version,
            &config.deployment,
            settings.llm.timeout(),
        )?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbeddingProvider::new(config.dimensions)),
    })
}

fn read_corpus(path: &Path) -> PipelineResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PipelineError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Rules for a local keyword index: the cache when present, otherwise the
/// segmented corpus.
pub fn load_rules_for_keyword(settings: &Settings) -> PipelineResult<Vec<Rule>> {
    let cache_path = settings.resolve_path(&settings.rules.cache);
    if cache_path.exists() {
        return Ok(cache::load_rules(&cache_path)?);
    }

    let source_path = settings.resolve_path(&settings.rules.source);
    match read_corpus(&source_path)? {
        Some(corpus) => Ok(cache::rules_from_corpus(&corpus, settings.rules.chunk_size)?),
        None => Err(PipelineError::NoRules {
            source_path,
            cache_path,
        }),
    }
}

/// Rules with embeddings from `embedder`, refreshing the cache from the
/// corpus when the corpus is available.
pub async fn load_rules_for_embedding(
    settings: &Settings,
    embedder: &dyn EmbeddingProvider,
) -> PipelineResult<Vec<Rule>> {
    let cache_path = settings.resolve_path(&settings.rules.cache);
    let source_path = settings.resolve_path(&settings.rules.source);

    if let Some(corpus) = read_corpus(&source_path)? {
        cache::refresh_cache(
            &corpus,
            &cache_path,
            settings.rules.chunk_size,
            embedder,
            false,
        )
        .await?;
        return Ok(cache::load_rules(&cache_path)?);
    }

    if !cache_path.exists() {
        return Err(PipelineError::NoRules {
            source_path,
            cache_path,
        });
    }

    // Without the corpus the cache cannot be rebuilt; it must match the model.
    if let Some(fingerprint) = cache::load_fingerprint(&cache_path) {
        if fingerprint.model != embedder.model_id() {
            return Err(PipelineError::ModelMismatch {
                cached: fingerprint.model,
                configured: embedder.model_id().to_string(),
            });
        }
    }
    Ok(cache::load_rules(&cache_path)?)
}

async fn rule_store(settings: &Settings) -> PipelineResult<RuleStore> {
    match settings.pipeline.retrieval {
        RetrievalMode::Keyword => {
            let search: Box<dyn SearchService> = match settings.search.resolved_backend() {
                SearchBackend::Azure => Box::new(AzureSearchClient::new(
                    &settings.search.endpoint,
                    &settings.search.api_key,
                    &settings.search.index,
                    &settings.search.api_version,
                    settings.search.timeout(),
                    settings.search.accept_invalid_certs,
                )?),
                SearchBackend::Local | SearchBackend::Auto => {
                    let rules = load_rules_for_keyword(settings)?;
                    Box::new(LocalRuleIndex::build(&rules)?)
                }
            };
            Ok(RuleStore::Keyword(KeywordRuleStore::new(search)))
        }
        RetrievalMode::Embedding => {
            let embedder = embedder_from_settings(settings)?;
            let rules = load_rules_for_embedding(settings, embedder.as_ref()).await?;
            let store = EmbeddingRuleStore::new(rules, embedder).await?;
            Ok(RuleStore::Embedding(store))
        }
    }
}

fn completion_client(settings: &Settings) -> ProviderResult<Arc<dyn CompletionClient>> {
    let llm = &settings.llm;
    let client = AzureOpenAiClient::new(
        &llm.endpoint,
        &llm.api_key,
        &llm.api_version,
        &llm.deployment,
        llm.timeout(),
    )?
    .with_temperature(llm.temperature);
    Ok(Arc::new(client))
}

impl CompliancePipeline {
    /// Build every component the settings select.
    pub async fn from_settings(settings: &Settings) -> PipelineResult<Self> {
        settings.validate().map_err(PipelineError::Config)?;
        let pipeline = &settings.pipeline;

        let needs_llm = pipeline.extraction == ExtractionMode::Model
            || pipeline.validation == ValidationMode::Model;
        let client = if needs_llm {
            Some(completion_client(settings)?)
        } else {
            None
        };

        let extractor: Box<dyn ClauseExtractor> = match (pipeline.extraction, &client) {
            (ExtractionMode::Model, Some(client)) => {
                Box::new(ModelClauseExtractor::new(Arc::clone(client)))
            }
            _ => Box::new(MarkerClauseExtractor::new(settings.clauses.parsed())),
        };

        let validator: Box<dyn ComplianceValidator> = match (pipeline.validation, &client) {
            (ValidationMode::Model, Some(client)) => Box::new(
                ModelValidator::new(Arc::clone(client)).with_context_rules(pipeline.context_rules),
            ),
            _ => Box::new(ThresholdValidator::new(pipeline.threshold)),
        };

        let rules = rule_store(settings).await?;

        tracing::debug!(
            target: "pipeline",
            "built pipeline: {} extraction, {} retrieval, {} validation",
            extractor.name(),
            rules.mode(),
            validator.name()
        );

        Ok(Self::new(extractor, rules, validator)?
            .with_chunk_size(settings.documents.chunk_size)?
            .with_retry(pipeline.retry_policy())
            .with_fail_fast(pipeline.fail_fast))
    }
}

/// Rebuild the persisted rule cache for the configured corpus and model.
pub async fn rebuild_rule_cache(settings: &Settings, force: bool) -> PipelineResult<rules::RefreshOutcome> {
    let source_path = settings.resolve_path(&settings.rules.source);
    let cache_path = settings.resolve_path(&settings.rules.cache);
    let corpus = read_corpus(&source_path)?.ok_or_else(|| PipelineError::NoRules {
        source_path: source_path.clone(),
        cache_path: cache_path.clone(),
    })?;

    let embedder = embedder_from_settings(settings)?;
    Ok(cache::refresh_cache(
        &corpus,
        &cache_path,
        settings.rules.chunk_size,
        embedder.as_ref(),
        force,
    )
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use tempfile::TempDir;

    fn offline_settings(dir: &Path) -> Settings {
        let mut settings = Settings {
            workspace_root: Some(dir.to_path_buf()),
            ..Settings::default()
        };
        settings.pipeline.extraction = ExtractionMode::Marker;
        settings.pipeline.retrieval = RetrievalMode::Embedding;
        settings.pipeline.validation = ValidationMode::Threshold;
        settings.embeddings.backend = EmbeddingBackend::Hashing;
        settings.embeddings.dimensions = 64;
        settings.rules.chunk_size = 8;
        settings
    }

    #[tokio::test]
    async fn test_offline_pipeline_builds_cache_and_runs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("mou_rules.txt"),
            "The purpose of the MOU must be stated. Confidential information must be protected.",
        )
        .unwrap();
        let settings = offline_settings(dir.path());

        let pipeline = CompliancePipeline::from_settings(&settings).await.unwrap();
        assert!(dir.path().join(".clausewise/rules.json").exists());

        let report = pipeline.run(&Document::new("empty", "")).await.unwrap();
        assert_eq!(report.findings.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_rules_are_reported() {
        let dir = TempDir::new().unwrap();
        let settings = offline_settings(dir.path());

        let err = CompliancePipeline::from_settings(&settings).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoRules { .. }));
    }

    #[tokio::test]
    async fn test_cache_from_other_model_is_rejected_without_corpus() {
        let dir = TempDir::new().unwrap();
        let corpus = dir.path().join("mou_rules.txt");
        std::fs::write(&corpus, "Either party may terminate with notice.").unwrap();

        let mut settings = offline_settings(dir.path());
        rebuild_rule_cache(&settings, false).await.unwrap();
        std::fs::remove_file(&corpus).unwrap();

        settings.embeddings.dimensions = 32;
        let err = CompliancePipeline::from_settings(&settings).await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_cache_without_fingerprint_from_other_model_is_rejected() {
        let dir = TempDir::new().unwrap();
        let corpus = dir.path().join("mou_rules.txt");
        std::fs::write(&corpus, "Either party may terminate with notice.").unwrap();

        let mut settings = offline_settings(dir.path());
        rebuild_rule_cache(&settings, false).await.unwrap();
        let cache_path = settings.resolve_path(&settings.rules.cache);
        std::fs::remove_file(cache::meta_path(&cache_path)).unwrap();
        std::fs::remove_file(&corpus).unwrap();

        settings.embeddings.dimensions = 32;
        let err = CompliancePipeline::from_settings(&settings).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Rules(rules::RuleError::DimensionMismatch {
                expected: 32,
                actual: 64,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_keyword_retrieval_uses_local_index_from_corpus() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mou_rules.txt"), "Termination needs notice.").unwrap();
        let mut settings = offline_settings(dir.path());
        settings.pipeline.retrieval = RetrievalMode::Keyword;
        settings.pipeline.validation = ValidationMode::Threshold;

        // Threshold validation cannot work from keyword hits.
        let err = CompliancePipeline::from_settings(&settings).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        let rules = load_rules_for_keyword(&settings).unwrap();
        assert_eq!(rules.len(), 1);
    }
}
