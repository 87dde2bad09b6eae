use crate::chunking::TextChunk;
use crate::config::{or_default, parsed, required, Lookup};
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use crate::store::{ScoredChunk, VectorStore};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Configuration for Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Collection holding the document chunks
    pub collection: String,
    /// Dimension of the configured embedding model
    pub vector_size: u64,
}

impl QdrantConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        Ok(QdrantConfig {
            url: required(lookup, "QDRANT_URL")?,
            api_key: lookup("QDRANT_API_KEY"),
            collection: or_default(lookup, "COLLECTION", "business_docs"),
            vector_size: parsed(lookup, "EMBEDDING_DIMENSIONS", 768)?,
        })
    }
}

/// Client for interacting with Qdrant
pub struct QdrantClient {
    client: Qdrant,
}

impl QdrantClient {
    /// Create a new Qdrant client
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder.build().map_err(store_error)?;
        Ok(QdrantClient { client })
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(store_error)
    }

    async fn create_collection(&self, collection: &str, dimensions: u64) -> Result<()> {
        info!("Creating collection {} ({} dimensions)", collection, dimensions);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions, Distance::Cosine)),
            )
            .await
            .map_err(|e| {
                RagError::VectorStore(format!("Failed to create collection {}: {}", collection, e))
            })?;

        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        info!("Deleting collection {}", collection);

        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| {
                RagError::VectorStore(format!("Failed to delete collection {}: {}", collection, e))
            })?;

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

        // Fresh ids: re-ingesting a document adds points instead of replacing them
        let points = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let payload = Payload::try_from(json!({
                    "text": chunk.text,
                    "document_id": chunk.document_id,
                    "chunk_index": chunk.chunk_index,
                    "start_position": chunk.start_position,
                }))
                .map_err(store_error)?;

                Ok(PointStruct::new(
                    Uuid::new_v4().to_string(),
                    embedding.values,
                    payload,
                ))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        let count = points.len();
        if count == 0 {
            return Ok(0);
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| {
                RagError::VectorStore(format!(
                    "Failed to upsert points in collection {}: {}",
                    collection, e
                ))
            })?;

        debug!("Stored {} points in {}", count, collection);
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        query: Embedding,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let request = SearchPointsBuilder::new(collection, query.values, limit as u64)
            .with_payload(true)
            .score_threshold(score_threshold);

        let response = self.client.search_points(request).await.map_err(|e| {
            RagError::VectorStore(format!("Failed to search collection {}: {}", collection, e))
        })?;

        // Convert search results back to chunks
        let chunks = response
            .result
            .into_iter()
            .filter_map(|point| {
                Some(ScoredChunk {
                    chunk: chunk_from_payload(&point.payload)?,
                    score: point.score,
                })
            })
            .collect();

        Ok(chunks)
    }
}

fn store_error(e: qdrant_client::QdrantError) -> RagError {
    RagError::VectorStore(e.to_string())
}

/// Rebuild a chunk from a point payload; points without text are skipped
fn chunk_from_payload(payload: &HashMap<String, Value>) -> Option<TextChunk> {
    let text = payload.get("text")?.as_str()?.to_string();
    let document_id = payload
        .get("document_id")
        .and_then(|v| v.as_str())
        .cloned()
        .unwrap_or_default();

    Some(TextChunk {
        text,
        document_id,
        chunk_index: payload_position(payload, "chunk_index"),
        start_position: payload_position(payload, "start_position"),
    })
}

/// Non-negative integer field, zero when absent or out of range
fn payload_position(payload: &HashMap<String, Value>, key: &str) -> usize {
    payload
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0)
}
