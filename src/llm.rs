use crate::error::{RagError, Result};
use crate::session::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which language model backend answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Fireworks,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::Fireworks];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Fireworks => "fireworks",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "fireworks" => Ok(ProviderKind::Fireworks),
            other => Err(RagError::InvalidRequest(format!(
                "unknown provider {:?}, expected \"gemini\" or \"fireworks\"",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = RagError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A chat prompt in provider-neutral form
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Standing instructions for the model
    pub system: String,
    /// Earlier turns of the conversation, oldest first
    pub history: Vec<Turn>,
    /// The message to answer, with its retrieved context
    pub user: String,
}

/// A backend that turns a prompt into generated text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// The configured language model clients, keyed by provider
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn LanguageModel>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ProviderKind, model: Arc<dyn LanguageModel>) -> Self {
        self.providers.insert(kind, model);
        self
    }

    /// Look up the client for a provider
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn LanguageModel>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(RagError::ProviderUnavailable(kind))
    }

    /// Providers with a configured client, in a stable order
    pub fn available(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }
}
