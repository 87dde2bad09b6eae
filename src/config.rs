use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

use crate::chunking::ChunkingConfig;
use crate::database::QdrantConfig;
use crate::filter::AbuseFilter;
use crate::fireworks::FireworksConfig;
use crate::gemini::GeminiConfig;
use crate::retriever::RetrievalConfig;

/// Looks up a configuration value by name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a variable from the process environment, ignoring blank values
pub fn from_process_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fetch a required value
pub fn required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Missing {}", key))
}

/// Fetch a value or fall back to a default
pub fn or_default(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Fetch and parse a value, falling back to a default when unset
pub fn parsed<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub frontend_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        ServerConfig {
            bind_addr: or_default(lookup, "BIND_ADDR", "127.0.0.1:8000"),
            frontend_origin: lookup("FRONTEND_ORIGIN"),
        }
    }
}

/// Everything the service needs, loaded once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub qdrant: QdrantConfig,
    pub gemini: GeminiConfig,
    /// `None` when no Fireworks key is set
    pub fireworks: Option<FireworksConfig>,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub filter: AbuseFilter,
}

impl Settings {
    /// Create the settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&from_process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let chunking = ChunkingConfig::from_lookup(lookup)?;
        chunking.validate()?;
        let retrieval = RetrievalConfig::from_lookup(lookup)?;
        retrieval.validate()?;

        Ok(Settings {
            server: ServerConfig::from_lookup(lookup),
            qdrant: QdrantConfig::from_lookup(lookup)?,
            gemini: GeminiConfig::from_lookup(lookup)?,
            fireworks: FireworksConfig::from_lookup(lookup)?,
            retrieval,
            chunking,
            filter: AbuseFilter::from_lookup(lookup),
        })
    }
}
