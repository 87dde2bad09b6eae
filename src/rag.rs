use crate::error::{RagError, Result};
use crate::filter::{AbuseFilter, ABUSE_MESSAGE};
use crate::llm::{ProviderKind, ProviderRegistry};
use crate::prompt::{build_prompt, OUT_OF_SCOPE_MESSAGE};
use crate::retriever::Retriever;
use crate::session::{SessionStore, Turn};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// How a chat message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Denylisted language; nothing else ran
    Rejected,
    /// No chunk cleared the similarity threshold
    OutOfScope,
    /// A language model produced the answer
    Answered {
        provider: ProviderKind,
        chunks: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub outcome: Outcome,
}

/// Result of a readiness check
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarmupReport {
    pub collection_ready: bool,
    pub providers: Vec<ProviderKind>,
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    retriever: Retriever,
    providers: ProviderRegistry,
    sessions: Arc<dyn SessionStore>,
    filter: AbuseFilter,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(
        retriever: Retriever,
        providers: ProviderRegistry,
        sessions: Arc<dyn SessionStore>,
        filter: AbuseFilter,
    ) -> Self {
        RagEngine {
            retriever,
            providers,
            sessions,
            filter,
        }
    }

    /// Answer one message: filter, retrieve, then refuse or generate, and
    /// record the exchange in the session.
    pub async fn chat(
        &self,
        message: &str,
        session_id: &str,
        provider: ProviderKind,
    ) -> Result<ChatReply> {
        let question = non_blank(message)?;

        // Denylisted language stops everything else
        if self.filter.is_abusive(question) {
            info!("Rejected abusive message in session {}", session_id);
            return Ok(ChatReply {
                answer: ABUSE_MESSAGE.to_string(),
                outcome: Outcome::Rejected,
            });
        }

        // Unconfigured providers fail before retrieval
        let model = self.providers.get(provider)?;

        // Retrieve relevant chunks
        let chunks = self.retriever.retrieve(question).await?;
        if chunks.is_empty() {
            info!("No relevant chunks for session {}, refusing", session_id);
            self.record(session_id, question, OUT_OF_SCOPE_MESSAGE).await;
            return Ok(ChatReply {
                answer: OUT_OF_SCOPE_MESSAGE.to_string(),
                outcome: Outcome::OutOfScope,
            });
        }

        // Build the prompt from context and session history
        let context: Vec<String> = chunks.into_iter().map(|c| c.chunk.text).collect();
        let history = self.sessions.get(session_id).await;
        let prompt = build_prompt(question, &context, history);

        // Generate answer
        let answer = model.generate(&prompt).await?;
        self.record(session_id, question, &answer).await;

        info!(
            "Answered session {} with {} using {} chunks",
            session_id,
            provider,
            context.len()
        );
        Ok(ChatReply {
            answer,
            outcome: Outcome::Answered {
                provider,
                chunks: context.len(),
            },
        })
    }

    /// Texts of the chunks a message would be answered from, best first
    pub async fn retrieved_chunks(&self, message: &str) -> Result<Vec<String>> {
        let question = non_blank(message)?;
        let results = self.retriever.retrieve(question).await?;
        Ok(results.into_iter().map(|r| r.chunk.text).collect())
    }

    /// Check that the collection is reachable and list the usable providers
    pub async fn warmup(&self) -> WarmupReport {
        let collection = self.retriever.collection();
        let collection_ready = match self.retriever.store().collection_exists(collection).await {
            Ok(exists) => {
                if !exists {
                    warn!("Collection {} does not exist yet", collection);
                }
                exists
            }
            Err(e) => {
                warn!("Vector store unreachable: {}", e);
                false
            }
        };

        let providers = self.providers.available();
        info!(
            "Warmup: collection {} ready={}, providers {:?}",
            collection, collection_ready, providers
        );

        WarmupReport {
            collection_ready,
            providers,
        }
    }

    async fn record(&self, session_id: &str, question: &str, answer: &str) {
        self.sessions
            .append(session_id, vec![Turn::user(question), Turn::assistant(answer)])
            .await;
    }
}

fn non_blank(message: &str) -> Result<&str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(RagError::InvalidRequest("message must not be empty".into()));
    }
    Ok(trimmed)
}
