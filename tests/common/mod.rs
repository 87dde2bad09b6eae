#![allow(dead_code)]

use async_trait::async_trait;
use docqa::chunking::ChunkingConfig;
use docqa::document::Document;
use docqa::embeddings::{Embedder, Embedding};
use docqa::error::{RagError, Result};
use docqa::filter::AbuseFilter;
use docqa::ingest::Ingestor;
use docqa::llm::{LanguageModel, Prompt, ProviderKind, ProviderRegistry};
use docqa::rag::RagEngine;
use docqa::retriever::{RetrievalConfig, Retriever};
use docqa::session::InMemorySessionStore;
use docqa::store::{InMemoryVectorStore, VectorStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const COLLECTION: &str = "business_docs";

pub const POLICY_TEXT: &str = "The MFI threshold is 5000";

/// Words that get a dimension of their own; anything else is ignored
const VOCABULARY: [&str; 8] = [
    "mfi",
    "threshold",
    "5000",
    "loan",
    "interest",
    "rate",
    "repayment",
    "borrower",
];

/// Bag-of-words embedder over a fixed vocabulary.
///
/// Texts sharing no vocabulary word score zero against each other.
#[derive(Default)]
pub struct VocabularyEmbedder {
    calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut values = vec![0.0; VOCABULARY.len()];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(i) = VOCABULARY.iter().position(|w| *w == token) {
                values[i] += 1.0;
            }
        }
        Ok(values.into())
    }
}

/// Language model that answers with a fixed text and keeps every prompt
pub struct RecordingModel {
    answer: String,
    prompts: Mutex<Vec<Prompt>>,
}

impl RecordingModel {
    pub fn new(answer: &str) -> Self {
        RecordingModel {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.answer.clone())
    }
}

/// Language model whose upstream always rejects the request
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(&self, _: &Prompt) -> Result<String> {
        Err(RagError::Provider {
            provider: ProviderKind::Gemini,
            message: "403 Forbidden".into(),
        })
    }
}

/// Engine wired to in-memory backends, with handles to inspect them
pub struct Harness {
    pub engine: Arc<RagEngine>,
    pub store: Arc<InMemoryVectorStore>,
    pub embedder: Arc<VocabularyEmbedder>,
    pub sessions: Arc<InMemorySessionStore>,
    pub gemini: Arc<RecordingModel>,
    pub fireworks: Arc<RecordingModel>,
}

impl Harness {
    /// Both providers configured, documents given as (name, text)
    pub async fn new(documents: &[(&str, &str)]) -> Self {
        Self::build(documents, &ProviderKind::ALL, None).await
    }

    pub async fn build(
        documents: &[(&str, &str)],
        enabled: &[ProviderKind],
        override_model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        let embedder = Arc::new(VocabularyEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new());
        if !documents.is_empty() {
            seed(embedder.clone(), store.clone(), documents).await;
        }

        let gemini = Arc::new(RecordingModel::new("Gemini says the threshold is 5000."));
        let fireworks = Arc::new(RecordingModel::new("Fireworks says the threshold is 5000."));

        let mut providers = ProviderRegistry::new();
        for kind in enabled {
            let model: Arc<dyn LanguageModel> = match (&override_model, kind) {
                (Some(model), _) => model.clone(),
                (None, ProviderKind::Gemini) => gemini.clone(),
                (None, ProviderKind::Fireworks) => fireworks.clone(),
            };
            providers = providers.with(*kind, model);
        }

        let sessions = Arc::new(InMemorySessionStore::new());
        let retriever = Retriever::new(
            embedder.clone(),
            store.clone(),
            COLLECTION,
            RetrievalConfig::default(),
        );
        let engine = RagEngine::new(
            retriever,
            providers,
            sessions.clone(),
            AbuseFilter::default(),
        );

        Harness {
            engine: Arc::new(engine),
            store,
            embedder,
            sessions,
            gemini,
            fireworks,
        }
    }
}

pub fn ingestor(embedder: Arc<VocabularyEmbedder>, store: Arc<InMemoryVectorStore>) -> Ingestor {
    Ingestor::new(embedder, store, COLLECTION, 8, ChunkingConfig::default()).unwrap()
}

async fn seed(
    embedder: Arc<VocabularyEmbedder>,
    store: Arc<InMemoryVectorStore>,
    documents: &[(&str, &str)],
) {
    store.ensure_collection(COLLECTION, 8).await.unwrap();
    let ingestor = ingestor(embedder, store);
    for (name, text) in documents {
        let document = Document {
            content: text.to_string(),
            document_id: name.to_string(),
            mime_type: "text/plain".to_string(),
        };
        ingestor.ingest_document(&document).await.unwrap();
    }
}
