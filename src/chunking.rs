use crate::config::{parsed, Lookup};
use crate::error::{RagError, Result};

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Identifier of the document this chunk belongs to
    pub document_id: String,
    /// Position of this chunk within its document
    pub chunk_index: usize,
    /// Starting position (in characters) of this chunk in the original document
    pub start_position: usize,
}

/// Sliding window parameters, measured in characters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: 800,
            chunk_overlap: 120,
        }
    }
}

impl ChunkingConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let defaults = ChunkingConfig::default();
        Ok(ChunkingConfig {
            chunk_size: parsed(lookup, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parsed(lookup, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split text into fixed-size overlapping windows.
///
/// Every window holds at most `chunk_size` characters and starts
/// `chunk_size - chunk_overlap` characters after the previous one. The last
/// window always ends at the end of the text, so nothing is dropped.
/// Callers must pass a validated config.
pub fn split_into_chunks(text: &str, document_id: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(char_count);
        chunks.push(TextChunk {
            text: text[boundaries[start]..boundaries[end]].to_string(),
            document_id: document_id.to_string(),
            chunk_index: chunks.len(),
            start_position: start,
        });

        if end == char_count {
            break;
        }
        start += config.step();
    }

    chunks
}
