use crate::config::{parsed, Lookup};
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::store::{ScoredChunk, VectorStore};
use log::debug;
use std::sync::Arc;

/// How many chunks a query may pull in, and how close they must be
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    /// Minimum similarity for a chunk to count as relevant
    pub score_threshold: f32,
    /// Maximum number of chunks per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            score_threshold: 0.35,
            top_k: 4,
        }
    }
}

impl RetrievalConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let defaults = RetrievalConfig::default();
        Ok(RetrievalConfig {
            score_threshold: parsed(lookup, "SCORE_THRESHOLD", defaults.score_threshold)?,
            top_k: parsed(lookup, "TOP_K", defaults.top_k)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".into()));
        }
        if !self.score_threshold.is_finite() {
            return Err(RagError::Config("score_threshold must be a finite number".into()));
        }
        Ok(())
    }
}

/// Embeds queries and finds the relevant chunks of one collection
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Retriever {
            embedder,
            store,
            collection: collection.into(),
            config,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Chunks scoring at or above the threshold, best first, at most `top_k`.
    /// An empty result means the query is out of scope.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let mut results = self
            .store
            .search(
                &self.collection,
                query_embedding,
                self.config.top_k,
                self.config.score_threshold,
            )
            .await?;

        results.retain(|r| r.score >= self.config.score_threshold);
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.config.top_k);

        debug!(
            "Retrieved {} chunks from {} (scores: {:?})",
            results.len(),
            self.collection,
            results.iter().map(|r| r.score).collect::<Vec<f32>>()
        );

        Ok(results)
    }
}
