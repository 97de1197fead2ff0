//! Configuration for where documents are read from and how they are chunked.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::chunker::DEFAULT_CHUNK_SIZE;

/// The `[documents]` settings section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory that relative document names are resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Document checked when the CLI is given no name.
    #[serde(default = "default_document")]
    pub default_document: String,

    /// Blob container URL. When set, documents are fetched over HTTP(S).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,

    /// Query string appended to blob URLs (e.g. a SAS token, with leading `?`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_query: Option<String>,

    /// Words per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_document() -> String {
    "proper_mou_document.txt".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_document: default_document(),
            blob_url: None,
            blob_query: None,
            chunk_size: default_chunk_size(),
        }
    }
}
