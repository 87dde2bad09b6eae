//! Fireworks AI client.
//!
//! Fireworks serves an OpenAI-compatible API; only the non-streaming
//! `POST {api_base}/v1/chat/completions` endpoint is used.

use crate::config::{or_default, parsed, Lookup};
use crate::error::{RagError, Result};
use crate::llm::{LanguageModel, Prompt, ProviderKind};
use crate::session::Role;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Fireworks API
#[derive(Debug, Clone)]
pub struct FireworksConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl FireworksConfig {
    /// Returns `None` when `FIREWORKS_API_KEY` is not set
    pub fn from_lookup(lookup: Lookup<'_>) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = lookup("FIREWORKS_API_KEY") else {
            return Ok(None);
        };

        Ok(Some(FireworksConfig {
            api_key,
            api_base: or_default(
                lookup,
                "FIREWORKS_API_BASE",
                "https://api.fireworks.ai/inference",
            ),
            model: or_default(
                lookup,
                "FIREWORKS_MODEL",
                "accounts/fireworks/models/mixtral-8x7b-instruct",
            ),
            temperature: parsed(lookup, "FIREWORKS_TEMPERATURE", 0.2)?,
            timeout_secs: parsed(lookup, "HTTP_TIMEOUT_SECS", 120)?,
        }))
    }
}

/// Chat completion client for Fireworks-hosted models
pub struct FireworksClient {
    config: FireworksConfig,
    client: reqwest::Client,
    url_chat: String,
}

impl FireworksClient {
    pub fn new(config: FireworksConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| RagError::Config(format!("Invalid Fireworks API key: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let url_chat = format!(
            "{}/v1/chat/completions",
            config.api_base.trim_end_matches('/')
        );

        Ok(FireworksClient {
            config,
            client,
            url_chat,
        })
    }

    fn provider_error(&self, message: String) -> RagError {
        error!("Fireworks generation failed: {}", message);
        RagError::Provider {
            provider: ProviderKind::Fireworks,
            message,
        }
    }
}

#[async_trait]
impl LanguageModel for FireworksClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatCompletionRequest::from_prompt(prompt, &self.config);
        debug!(
            "POST {} model={} messages={}",
            self.url_chat,
            self.config.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.url_chat)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.provider_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.provider_error(format!(
                "API request failed: {} {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.provider_error(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| self.provider_error("No response generated".to_string()))
    }
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_prompt(prompt: &'a Prompt, config: &'a FireworksConfig) -> Self {
        let mut messages = Vec::with_capacity(prompt.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: &prompt.system,
        });
        messages.extend(prompt.history.iter().map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &turn.text,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });

        ChatCompletionRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: 2048,
        }
    }
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
