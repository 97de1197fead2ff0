//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and the fixed-size word chunker used to cut a
//! document into embedding-sized pieces.

use thiserror::Error;

use super::types::Chunk;
use crate::types::ChunkId;

/// Words per chunk when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Errors from chunking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("document has more than {} chunks", u32::MAX)]
    TooManyChunks,
}

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document text into ordered chunks.
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>, SegmentError>;
}

/// Groups whitespace-delimited words into chunks of `chunk_size` words.
///
/// The last chunk may be shorter. Empty input produces no chunks.
#[derive(Debug, Clone, Copy)]
pub struct WordChunker {
    chunk_size: usize,
}

impl WordChunker {
    pub fn new(chunk_size: usize) -> Result<Self, SegmentError> {
        if chunk_size == 0 {
            return Err(SegmentError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for WordChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>, SegmentError> {
        let words: Vec<&str> = text.split_whitespace().collect();

        words
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(i, group)| {
                let id = u32::try_from(i + 1)
                    .ok()
                    .and_then(ChunkId::new)
                    .ok_or(SegmentError::TooManyChunks)?;
                Ok(Chunk::new(id, group.join(" ")))
            })
            .collect()
    }
}

/// Split `text` into chunks of `chunk_size` words.
pub fn segment(text: &str, chunk_size: usize) -> Result<Vec<Chunk>, SegmentError> {
    WordChunker::new(chunk_size)?.chunk(text)
}
