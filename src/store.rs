use crate::chunking::TextChunk;
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A stored chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    /// Similarity to the query, higher is closer
    pub score: f32,
}

/// Storage for embedded chunks with similarity search
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    async fn create_collection(&self, collection: &str, dimensions: u64) -> Result<()>;

    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Store chunks with their embeddings, returning how many were written.
    /// Existing points are never overwritten.
    async fn store_chunks(
        &self,
        collection: &str,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> Result<usize>;

    /// Nearest chunks scoring at least `score_threshold`, best first
    async fn search(
        &self,
        collection: &str,
        query: Embedding,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>>;

    /// Create the collection unless it is already there
    async fn ensure_collection(&self, collection: &str, dimensions: u64) -> Result<()> {
        if !self.collection_exists(collection).await? {
            self.create_collection(collection, dimensions).await?;
        }
        Ok(())
    }
}

/// Brute-force cosine search over chunks held in memory
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<(TextChunk, Embedding)>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn create_collection(&self, collection: &str, _dimensions: u64) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn store_chunks(
        &self,
        collection: &str,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::VectorStore(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut collections = self.collections.write().await;
        let points = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;
        let count = chunks.len();
        points.extend(chunks.into_iter().zip(embeddings));
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        query: Embedding,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let collections = self.collections.read().await;
        let points = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let mut results: Vec<ScoredChunk> = points
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query.values, &embedding.values),
            })
            .filter(|scored| scored.score >= score_threshold)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::VectorStore(format!("collection {} does not exist", collection))
}

/// Cosine similarity; zero when either vector has no magnitude or sizes differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
