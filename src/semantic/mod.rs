//! Embeddings and similarity scoring.
//!
//! This module provides the embedding providers used to vectorize clause
//! and rule text, and the cosine scorer used to rank rules against clauses.

mod provider;
mod similarity;

pub use provider::{
    AzureEmbeddingProvider, EmbeddingProvider, FastEmbedProvider, HashingEmbeddingProvider,
    parse_model_name,
};
pub use similarity::{cosine_similarity, rank_by_similarity};

/// Similarity thresholds.
pub mod thresholds {
    /// Minimum similarity for a clause to count as covered by a rule
    pub const DEFAULT: f32 = 0.75;
}
