use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use std::sync::Arc;

use docqa::config::Settings;
use docqa::database::QdrantClient;
use docqa::embeddings::Embedder;
use docqa::fireworks::FireworksClient;
use docqa::gemini::GeminiClient;
use docqa::ingest::{expand_inputs, Ingestor};
use docqa::llm::{ProviderKind, ProviderRegistry};
use docqa::rag::RagEngine;
use docqa::retriever::Retriever;
use docqa::server::start_server;
use docqa::session::InMemorySessionStore;
use docqa::store::VectorStore;

/// Question answering over business documents, backed by Qdrant and Gemini/Fireworks
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the chat API server
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Load documents into the collection (supports text and PDF)
    Ingest {
        /// Delete and recreate the collection first
        #[arg(long)]
        reset: bool,

        /// Files or quoted patterns such as "data/*.pdf"
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Parse command line arguments and load configuration
    let args = Args::parse();
    let mut settings = Settings::from_env().context("Invalid configuration")?;

    // Gemini embeds both documents and queries
    let gemini = Arc::new(GeminiClient::new(settings.gemini.clone())?);
    let embedder: Arc<dyn Embedder> = gemini.clone();
    let store: Arc<dyn VectorStore> = Arc::new(
        QdrantClient::new(&settings.qdrant).context("Failed to initialize Qdrant client")?,
    );

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                settings.server.bind_addr = bind;
            }

            // A missing collection is created, an unreachable store only warned about
            if let Err(e) = store
                .ensure_collection(&settings.qdrant.collection, settings.qdrant.vector_size)
                .await
            {
                warn!("Could not prepare collection {}: {}", settings.qdrant.collection, e);
            }

            // Register the providers that have credentials
            let mut providers = ProviderRegistry::new().with(ProviderKind::Gemini, gemini);
            match settings.fireworks.clone() {
                Some(config) => {
                    let fireworks = FireworksClient::new(config)?;
                    providers = providers.with(ProviderKind::Fireworks, Arc::new(fireworks));
                }
                None => info!("FIREWORKS_API_KEY not set, Fireworks provider disabled"),
            }

            let retriever = Retriever::new(
                embedder,
                store,
                settings.qdrant.collection.clone(),
                settings.retrieval,
            );
            let engine = RagEngine::new(
                retriever,
                providers,
                Arc::new(InMemorySessionStore::new()),
                settings.filter.clone(),
            );

            start_server(Arc::new(engine), &settings.server).await
        }
        Command::Ingest { reset, paths } => {
            let ingestor = Ingestor::new(
                embedder,
                store,
                settings.qdrant.collection.clone(),
                settings.qdrant.vector_size,
                settings.chunking,
            )?;

            if reset {
                ingestor
                    .reset()
                    .await
                    .context("Failed to reset collection")?;
            }

            let paths = expand_inputs(&paths);
            let summary = ingestor.ingest_files(&paths).await?;
            if summary.all_failed() {
                bail!("No documents were ingested");
            }
            Ok(())
        }
    }
}
