//! Rule retrieval strategies.

use std::sync::Arc;

use super::cache::embed_rules;
use super::search::SearchService;
use super::{Rule, RuleContext, RuleError, RuleMatch, RuleResult};
use crate::error::{ProviderError, ProviderResult};
use crate::semantic::{EmbeddingProvider, rank_by_similarity};
use crate::types::{ClauseKind, NO_RULE_FOUND};

/// Field holding the rule text in a search index.
const CONTENT_FIELD: &str = "content";

/// Text embedded once to learn the embedder's output length.
const DIMENSION_SAMPLE: &str = "dimension sample";

/// Best keyword hit for the clause name.
pub struct KeywordRuleStore {
    search: Box<dyn SearchService>,
}

impl KeywordRuleStore {
    pub fn new(search: Box<dyn SearchService>) -> Self {
        Self { search }
    }

    pub async fn retrieve(&self, clause: ClauseKind) -> ProviderResult<RuleContext> {
        let query = clause.search_text();
        let hits = self.search.search(&query, 1, &[CONTENT_FIELD]).await?;

        let text = hits
            .first()
            .and_then(|hit| hit.field(CONTENT_FIELD))
            .map(str::to_string)
            .unwrap_or_else(|| {
                tracing::debug!(target: "rules", "no keyword hit for '{query}'");
                NO_RULE_FOUND.to_string()
            });

        Ok(RuleContext::Text(text))
    }
}

/// Every rule ranked by cosine similarity to the clause text.
pub struct EmbeddingRuleStore {
    rules: Vec<Rule>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: Option<usize>,
}

impl EmbeddingRuleStore {
    /// Take ownership of `rules`, embedding any that lack a vector.
    pub async fn new(mut rules: Vec<Rule>, embedder: Arc<dyn EmbeddingProvider>) -> RuleResult<Self> {
        let missing = rules.iter().filter(|r| r.embedding.is_none()).count();
        if missing > 0 {
            tracing::debug!(target: "rules", "embedding {missing} rules without cached vectors");
            embed_rules(&mut rules, embedder.as_ref()).await?;
        }

        if let Some(rule) = rules.iter().find(|r| r.embedding.is_none()) {
            return Err(RuleError::MissingEmbedding(rule.id.clone()));
        }

        // Cached vectors may come from another model.
        let dimension = if rules.is_empty() {
            None
        } else {
            Some(embedder.embed(DIMENSION_SAMPLE).await?.len())
        };
        if let Some(expected) = dimension {
            for rule in &rules {
                let actual = rule.embedding.as_ref().map_or(0, Vec::len);
                if actual != expected {
                    return Err(RuleError::DimensionMismatch {
                        rule_id: rule.id.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }

        Ok(Self {
            rules,
            embedder,
            dimension,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub async fn retrieve(&self, clause_text: &str) -> ProviderResult<RuleContext> {
        let query = self.embedder.embed(clause_text).await?;
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(ProviderError::Embedding(format!(
                    "clause embedding has {} dimensions, rules have {expected}",
                    query.len()
                )));
            }
        }

        let candidates = self
            .rules
            .iter()
            .filter_map(|rule| rule.embedding.as_deref().map(|e| (rule, e)));

        let matches = rank_by_similarity(&query, candidates)
            .into_iter()
            .map(|(rule, score)| RuleMatch {
                rule_id: rule.id.clone(),
                text: rule.text.clone(),
                score,
            })
            .collect();

        Ok(RuleContext::Ranked(matches))
    }
}

/// The retrieval mode a run uses.
pub enum RuleStore {
    Keyword(KeywordRuleStore),
    Embedding(EmbeddingRuleStore),
}

impl RuleStore {
    /// Rules relevant to one clause.
    pub async fn retrieve(&self, clause: ClauseKind, clause_text: &str) -> ProviderResult<RuleContext> {
        match self {
            Self::Keyword(store) => store.retrieve(clause).await,
            Self::Embedding(store) => store.retrieve(clause_text).await,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Keyword(_) => "keyword",
            Self::Embedding(_) => "embedding",
        }
    }
}
