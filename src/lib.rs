pub mod chunking;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod filter;
pub mod fireworks;
pub mod gemini;
pub mod ingest;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod retriever;
pub mod server;
pub mod session;
pub mod store;
