//! In-memory tantivy BM25 index over the rule corpus.
//!
//! Serves keyword retrieval when no external search service is configured.

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument as Document};

use super::schema::RuleSchema;
use super::search::{SearchHit, SearchService};
use super::{Rule, RuleResult};
use crate::error::{ProviderError, ProviderResult};

/// Writer heap; the corpus is small and indexed once.
const WRITER_HEAP_SIZE: usize = 50_000_000;

/// Rules indexed for full-text search.
pub struct LocalRuleIndex {
    index: Index,
    reader: IndexReader,
    schema: RuleSchema,
    rule_count: usize,
}

impl std::fmt::Debug for LocalRuleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRuleIndex")
            .field("rule_count", &self.rule_count)
            .finish()
    }
}

impl LocalRuleIndex {
    /// Index every rule's id and text.
    pub fn build(rules: &[Rule]) -> RuleResult<Self> {
        let (tantivy_schema, schema) = RuleSchema::build();
        let index = Index::create_in_ram(tantivy_schema);

        {
            let mut writer: IndexWriter<Document> =
                index.writer_with_num_threads(1, WRITER_HEAP_SIZE)?;
            for rule in rules {
                let mut doc = Document::new();
                doc.add_text(schema.id, &rule.id);
                doc.add_text(schema.content, &rule.text);
                writer.add_document(doc)?;
            }
            writer.commit()?;
        }

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        reader.reload()?;

        tracing::debug!(target: "rules", "indexed {} rules for keyword search", rules.len());

        Ok(Self {
            index,
            reader,
            schema,
            rule_count: rules.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }

    fn search_sync(
        &self,
        query: &str,
        top_k: usize,
        fields: &[&str],
    ) -> tantivy::Result<Vec<SearchHit>> {
        if top_k == 0 || self.rule_count == 0 {
            return Ok(Vec::new());
        }

        let parser = QueryParser::for_index(&self.index, vec![self.schema.content]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(target: "rules", "ignored {} query syntax errors in '{query}'", errors.len());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(top_k))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: Document = searcher.doc(address)?;
            let mut selected = serde_json::Map::new();
            for name in fields {
                let Some(field) = self.schema.field(name) else {
                    continue;
                };
                if let Some(text) = doc.get_first(field).and_then(|v| v.as_str()) {
                    selected.insert(
                        (*name).to_string(),
                        serde_json::Value::String(text.to_string()),
                    );
                }
            }
            hits.push(SearchHit {
                score,
                fields: selected,
            });
        }

        Ok(hits)
    }
}

#[async_trait]
impl SearchService for LocalRuleIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        fields: &[&str],
    ) -> ProviderResult<Vec<SearchHit>> {
        self.search_sync(query, top_k, fields)
            .map_err(|e| ProviderError::Search(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new(
                "R1",
                "The purpose of the MOU must be stated clearly and lawfully.",
            ),
            Rule::new(
                "R2",
                "Confidential information shall not be disclosed to third parties.",
            ),
            Rule::new(
                "R3",
                "Termination requires thirty days written notice; the term must be fixed.",
            ),
        ]
    }

    #[tokio::test]
    async fn test_best_rule_for_clause_name() {
        let index = LocalRuleIndex::build(&rules()).unwrap();

        let hits = index.search("term termination", 1, &["content"]).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].field("content").unwrap().starts_with("Termination"));

        let hits = index.search("confidentiality", 1, &["id", "content"]).await.unwrap();
        assert_eq!(hits[0].field("id"), Some("R2"));
    }

    #[tokio::test]
    async fn test_unselected_fields_are_omitted() {
        let index = LocalRuleIndex::build(&rules()).unwrap();
        let hits = index.search("purpose", 1, &["content"]).await.unwrap();
        assert!(hits[0].field("id").is_none());
    }

    #[tokio::test]
    async fn test_no_match_and_empty_corpus() {
        let index = LocalRuleIndex::build(&rules()).unwrap();
        assert!(index.search("arbitration", 1, &["content"]).await.unwrap().is_empty());

        let empty = LocalRuleIndex::build(&[]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.search("purpose", 1, &["content"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_syntax_errors_are_lenient() {
        let index = LocalRuleIndex::build(&rules()).unwrap();
        let hits = index.search("purpose AND (", 3, &["content"]).await.unwrap();
        assert!(!hits.is_empty());
    }
}
