//! Clause extraction: document text to a complete [`ClauseMap`].

mod marker;
mod model;

pub use marker::MarkerClauseExtractor;
pub use model::{CLAUSES_SCHEMA_NAME, ModelClauseExtractor, clauses_schema};

use async_trait::async_trait;

use crate::documents::{Chunk, Document};
use crate::error::ProviderResult;
use crate::types::ClauseMap;

/// Produces clause text for every clause category.
///
/// Implementations never return a partial map; clauses they cannot find
/// carry a sentinel text instead.
#[async_trait]
pub trait ClauseExtractor: Send + Sync {
    async fn extract(&self, document: &Document, chunks: &[Chunk]) -> ProviderResult<ClauseMap>;

    fn name(&self) -> &'static str;
}
