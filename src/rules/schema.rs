//! Tantivy schema for the local rule index.

use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};

/// Schema fields for rule storage.
#[derive(Debug, Clone)]
pub struct RuleSchema {
    /// Rule identifier, exact match only.
    pub id: Field,

    /// Rule text, tokenized for BM25 and stored for retrieval.
    pub content: Field,
}

impl RuleSchema {
    /// Build the schema for rule storage.
    pub fn build() -> (Schema, Self) {
        let mut builder = SchemaBuilder::default();

        let id = builder.add_text_field("id", STRING | STORED);

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("en_stem")
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();
        let content = builder.add_text_field("content", text_options);

        (builder.build(), Self { id, content })
    }

    /// Resolve a field by the name callers use in `select` lists.
    pub fn field(&self, name: &str) -> Option<Field> {
        match name {
            "id" => Some(self.id),
            "content" => Some(self.content),
            _ => None,
        }
    }
}
