use crate::config::{or_default, parsed, Lookup};
use crate::embeddings::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::llm::{LanguageModel, Prompt, ProviderKind};
use crate::session::Role;
use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The batch endpoint accepts at most this many texts per call
const MAX_BATCH_SIZE: usize = 100;

/// Configuration for Gemini API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    /// Chat model, e.g. `gemini-2.5-flash`
    pub model: String,
    pub temperature: f32,
    /// Embedding model, e.g. `models/text-embedding-004`
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .ok_or_else(|| anyhow::anyhow!("Missing GEMINI_API_KEY (or GOOGLE_API_KEY)"))?;

        Ok(GeminiConfig {
            api_key,
            api_base: or_default(
                lookup,
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
            model: or_default(lookup, "GEMINI_MODEL", "gemini-2.5-flash"),
            temperature: parsed(lookup, "GEMINI_TEMPERATURE", 0.2)?,
            embedding_model: or_default(lookup, "EMBEDDING_MODEL", "models/text-embedding-004"),
            timeout_secs: parsed(lookup, "HTTP_TIMEOUT_SECS", 120)?,
        })
    }
}

/// Client for interacting with Gemini API: embeddings and text generation
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(GeminiClient { config, client })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/{}:{}",
            self.config.api_base.trim_end_matches('/'),
            model_path(model),
            method
        )
    }

    async fn post<Req, Resp>(&self, url: &str, request: &Req) -> std::result::Result<Resp, String>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("API request failed: {} {}", status, error_text));
        }

        response.json::<Resp>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let model = model_path(&self.config.embedding_model);
        let request = EmbedContentRequest {
            model: &model,
            content: Content::text(None, text),
        };

        let url = self.url(&self.config.embedding_model, "embedContent");
        let response: EmbeddingResponse = self
            .post(&url, &request)
            .await
            .map_err(RagError::Embedding)?;

        Ok(Embedding {
            values: response.embedding.values,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let model = model_path(&self.config.embedding_model);
        let url = self.url(&self.config.embedding_model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedContentRequest {
                        model: &model,
                        content: Content::text(None, text),
                    })
                    .collect(),
            };

            let response: BatchEmbeddingResponse = self
                .post(&url, &request)
                .await
                .map_err(RagError::Embedding)?;

            if response.embeddings.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Requested {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| Embedding {
                values: e.values,
            }));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = GenerateRequest::from_prompt(prompt, self.config.temperature);
        let url = self.url(&self.config.model, "generateContent");
        debug!(
            "Sending prompt to {} ({} history turns, {} chars)",
            self.config.model,
            prompt.history.len(),
            prompt.user.len()
        );

        let response: GenerateResponse = self.post(&url, &request).await.map_err(|message| {
            error!("Gemini generation failed: {}", message);
            RagError::Provider {
                provider: ProviderKind::Gemini,
                message,
            }
        })?;

        response.into_text().ok_or_else(|| RagError::Provider {
            provider: ProviderKind::Gemini,
            message: "No response generated".to_string(),
        })
    }
}

/// Resource path of a model: `models/<name>`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct BatchEmbeddingResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a Prompt, temperature: f32) -> Self {
        let mut contents: Vec<Content<'a>> = prompt
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Content::text(Some(role), &turn.text)
            })
            .collect();
        contents.push(Content::text(Some("user"), &prompt.user));

        GenerateRequest {
            system_instruction: Content::text(None, &prompt.system),
            contents,
            generation_config: GenerationConfig {
                temperature,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 2048,
            },
        }
    }
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'static str>, text: &'a str) -> Self {
        Content {
            role,
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts joined
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}
