//! Document ingestion and chunking.
//!
//! This module provides:
//! - Whole-document reads from disk or an HTTP blob endpoint
//! - Fixed-size word chunking for embedding and marker matching

pub mod chunker;
pub mod config;
pub mod source;
pub mod types;

pub use chunker::{Chunker, DEFAULT_CHUNK_SIZE, SegmentError, WordChunker, segment};
pub use config::DocumentsConfig;
pub use source::{DocumentSource, FsDocumentSource, HttpDocumentSource};
pub use types::{Chunk, Document};

use std::time::Duration;

use crate::error::ProviderResult;

/// Build the document source described by the settings.
///
/// A configured `blob_url` wins over the local root directory.
pub fn source_from_config(
    config: &DocumentsConfig,
    timeout: Duration,
) -> ProviderResult<Box<dyn DocumentSource>> {
    match &config.blob_url {
        Some(url) => {
            tracing::debug!(target: "documents", "reading documents from {url}");
            Ok(Box::new(HttpDocumentSource::new(
                url,
                config.blob_query.as_deref(),
                timeout,
            )?))
        }
        None => {
            tracing::debug!(target: "documents", "reading documents from {}", config.root.display());
            Ok(Box::new(FsDocumentSource::new(config.root.clone())))
        }
    }
}
