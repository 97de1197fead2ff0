//! Reference rules and retrieval.
//!
//! Rules live either behind a keyword [`SearchService`] (an Azure AI Search
//! index or the in-memory [`LocalRuleIndex`]) or in memory with precomputed
//! embeddings. [`RuleStore`] hides which one a run uses; validators only see
//! the [`RuleContext`] it returns.

pub mod cache;
mod index;
mod schema;
mod search;
mod store;

pub use cache::{CacheFingerprint, RefreshOutcome, refresh_cache};
pub use index::LocalRuleIndex;
pub use search::{AzureSearchClient, SearchHit, SearchService};
pub use store::{EmbeddingRuleStore, KeywordRuleStore, RuleStore};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::SegmentError;
use crate::error::ProviderError;

/// A reference rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Rule {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A rule scored against one clause.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule_id: String,
    pub text: String,
    pub score: f32,
}

/// What retrieval found for a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleContext {
    /// Best keyword match, or [`crate::types::NO_RULE_FOUND`].
    Text(String),
    /// Every rule, most similar first.
    Ranked(Vec<RuleMatch>),
}

impl RuleContext {
    /// Highest similarity in a ranked context; 0.0 when empty or keyword.
    pub fn max_similarity(&self) -> f32 {
        match self {
            Self::Text(_) => 0.0,
            Self::Ranked(matches) => matches.first().map_or(0.0, |m| m.score),
        }
    }

    pub fn best_match(&self) -> Option<&RuleMatch> {
        match self {
            Self::Text(_) => None,
            Self::Ranked(matches) => matches.first(),
        }
    }

    /// Rule text shown to a language model: the keyword hit, or the
    /// `top_n` best ranked rules separated by blank lines.
    pub fn prompt_text(&self, top_n: usize) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Ranked(matches) if matches.is_empty() => {
                crate::types::NO_RULE_FOUND.to_string()
            }
            Self::Ranked(matches) => matches
                .iter()
                .take(top_n.max(1))
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Errors loading, building or querying rules.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Invalid rule cache {}: {reason}", path.display())]
    InvalidCache { path: PathBuf, reason: String },

    #[error("Rule '{0}' has no embedding")]
    MissingEmbedding(String),

    #[error(
        "Rule '{rule_id}' has a {actual}-dimension embedding but the embedder produces {expected}; run 'clausewise rules build --force'"
    )]
    DimensionMismatch {
        rule_id: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Segment(#[from] SegmentError),
}

pub type RuleResult<T> = Result<T, RuleError>;
