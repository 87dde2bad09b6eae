use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Session used when the caller does not send one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Turn {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Conversation history keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All turns of a session, oldest first; empty for unknown sessions
    async fn get(&self, session_id: &str) -> Vec<Turn>;

    /// Add turns to the end of a session in one step, creating it if needed.
    /// Turns appended together are never interleaved with another call's.
    async fn append(&self, session_id: &str, turns: Vec<Turn>);
}

/// Process-lifetime session history
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn append(&self, session_id: &str, turns: Vec<Turn>) {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .extend(turns);
    }
}
