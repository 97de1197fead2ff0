//! Marker-based extraction over document chunks.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::ClauseExtractor;
use crate::documents::{Chunk, Document};
use crate::error::ProviderResult;
use crate::types::{ClauseKind, ClauseMap, NOT_FOUND};

/// Collects every chunk whose text contains a clause's marker.
///
/// Matching is case-insensitive. A chunk may match several markers and then
/// appears under each of those clauses.
#[derive(Debug, Clone)]
pub struct MarkerClauseExtractor {
    markers: BTreeMap<ClauseKind, String>,
}

impl MarkerClauseExtractor {
    /// Markers for the given clauses; the rest use their default marker.
    pub fn new(markers: impl IntoIterator<Item = (ClauseKind, String)>) -> Self {
        let mut all: BTreeMap<ClauseKind, String> = ClauseKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_marker().to_string()))
            .collect();
        for (kind, marker) in markers {
            all.insert(kind, marker.to_lowercase());
        }
        Self { markers: all }
    }

    pub fn marker(&self, kind: ClauseKind) -> &str {
        self.markers
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_marker())
    }

    /// Marker matching without the async trait plumbing.
    pub fn extract_from_chunks(&self, chunks: &[Chunk]) -> ClauseMap {
        let lowered: Vec<String> = chunks.iter().map(|c| c.text.to_lowercase()).collect();

        let mut clauses = ClauseMap::filled(NOT_FOUND);
        for kind in ClauseKind::ALL {
            let marker = self.marker(kind);
            let matched: Vec<&str> = chunks
                .iter()
                .zip(&lowered)
                .filter(|(_, lower)| lower.contains(marker))
                .map(|(chunk, _)| chunk.text.trim())
                .collect();

            if !matched.is_empty() {
                clauses.set(kind, matched.join("\n"));
            }
        }
        clauses
    }
}

impl Default for MarkerClauseExtractor {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

#[async_trait]
impl ClauseExtractor for MarkerClauseExtractor {
    async fn extract(&self, _document: &Document, chunks: &[Chunk]) -> ProviderResult<ClauseMap> {
        Ok(self.extract_from_chunks(chunks))
    }

    fn name(&self) -> &'static str {
        "marker"
    }
}
