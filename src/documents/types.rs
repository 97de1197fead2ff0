//! Core types for loaded documents and their chunks.

use serde::{Deserialize, Serialize};

use crate::types::ChunkId;

/// A loaded MOU. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the text came from (file name or URL), for logs and reports.
    source: String,

    /// Full UTF-8 text.
    text: String,

    /// Whitespace-delimited word count, computed once on load.
    word_count: usize,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self {
            source: source.into(),
            text,
            word_count,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}

/// A contiguous slice of a document's words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the source document (1-based).
    pub id: ChunkId,

    /// The words of this chunk joined by single spaces.
    pub text: String,

    /// Attached lazily by an embedding provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(id: ChunkId, text: String) -> Self {
        Self {
            id,
            text,
            embedding: None,
        }
    }

    /// Get a preview of the content (first N characters).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_word_count() {
        let doc = Document::new("mou.txt", "  This Memorandum\nof Understanding\t");
        assert_eq!(doc.word_count(), 4);
        assert!(!doc.is_empty());
        assert!(Document::new("empty.txt", " \n ").is_empty());
    }

    #[test]
    fn test_chunk_preview_respects_char_boundaries() {
        let chunk = Chunk::new(ChunkId::new(1).unwrap(), "Société Générale".to_string());
        assert_eq!(chunk.preview(4), "Soci");
        assert_eq!(chunk.preview(6), "Sociét");
        assert_eq!(chunk.preview(100), "Société Générale");
    }
}
