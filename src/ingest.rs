use crate::chunking::{split_into_chunks, ChunkingConfig};
use crate::document::Document;
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::store::VectorStore;
use globset::GlobBuilder;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Expand shell-style patterns such as `data/*.pdf` into file paths.
///
/// Arguments without wildcards, and patterns that match nothing, are kept as
/// literal paths so the ingestion run reports them.
pub fn expand_inputs<S: AsRef<str>>(inputs: &[S]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let matches = match_pattern(input);
        if matches.is_empty() {
            paths.push(PathBuf::from(input));
        } else {
            debug!("{} matched {} files", input, matches.len());
            paths.extend(matches);
        }
    }
    paths
}

fn match_pattern(pattern: &str) -> Vec<PathBuf> {
    if !pattern.contains(GLOB_META) {
        return Vec::new();
    }

    let matcher = match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            warn!("Invalid pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    // Walk from the longest wildcard-free prefix
    let mut root = PathBuf::new();
    let mut rest = 0;
    for component in Path::new(pattern).components() {
        if rest == 0 && !component.as_os_str().to_string_lossy().contains(GLOB_META) {
            root.push(component);
        } else {
            rest += 1;
        }
    }

    let relative = root.as_os_str().is_empty();
    let mut walker = WalkDir::new(if relative { Path::new(".") } else { root.as_path() })
        .min_depth(1)
        .sort_by_file_name();
    if !pattern.contains("**") {
        walker = walker.max_depth(rest);
    }

    walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            let path = if relative {
                path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path)
            } else {
                path
            };
            matcher.is_match(&path).then_some(path)
        })
        .collect()
}

/// What happened to one input file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Chunks written, or why the file was skipped
    pub outcome: std::result::Result<FileIngested, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileIngested {
    pub document_id: String,
    pub chunks: usize,
}

/// Per-file results of an ingestion run
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub reports: Vec<FileReport>,
}

impl IngestSummary {
    pub fn total_chunks(&self) -> usize {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok())
            .map(|ok| ok.chunks)
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_err()).count()
    }

    /// True when there was input and none of it made it in
    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty() && self.failed() == self.reports.len()
    }

    /// Chunk count per source document
    pub fn by_source(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for ok in self.reports.iter().filter_map(|r| r.outcome.as_ref().ok()) {
            *counts.entry(ok.document_id.clone()).or_insert(0) += ok.chunks;
        }
        counts
    }
}

/// Loads files, chunks and embeds them, and writes them to a collection.
///
/// There is no deduplication: ingesting the same file twice stores its
/// chunks twice unless the collection is reset first.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    vector_size: u64,
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        vector_size: u64,
        chunking: ChunkingConfig,
    ) -> Result<Self> {
        chunking.validate()?;
        Ok(Ingestor {
            embedder,
            store,
            collection: collection.into(),
            vector_size,
            chunking,
        })
    }

    /// Drop every stored chunk and start with an empty collection
    pub async fn reset(&self) -> Result<()> {
        if self.store.collection_exists(&self.collection).await? {
            self.store.delete_collection(&self.collection).await?;
        }
        self.store
            .create_collection(&self.collection, self.vector_size)
            .await?;
        info!("Collection {} reset", self.collection);
        Ok(())
    }

    /// Chunk, embed and store one loaded document, returning the chunk count
    pub async fn ingest_document(&self, document: &Document) -> Result<usize> {
        let chunks = split_into_chunks(&document.content, &document.document_id, &self.chunking);
        if chunks.is_empty() {
            warn!("{} produced no chunks", document.document_id);
            return Ok(0);
        }
        info!("Split {} into {} chunks", document.document_id, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        self.store
            .store_chunks(&self.collection, chunks, embeddings)
            .await
    }

    /// Ingest several files. A failing file is reported and skipped; only a
    /// collection that cannot be prepared aborts the run.
    pub async fn ingest_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestSummary> {
        self.store
            .ensure_collection(&self.collection, self.vector_size)
            .await?;

        let mut summary = IngestSummary::default();
        for path in paths {
            let path = path.as_ref().to_path_buf();
            let outcome = self.ingest_file(&path).await.map_err(|e| e.to_string());

            match &outcome {
                Ok(ok) => info!("Indexed {} chunks from {}", ok.chunks, path.display()),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
            summary.reports.push(FileReport { path, outcome });
        }

        info!(
            "Indexed {} chunks into collection {} ({} of {} files failed)",
            summary.total_chunks(),
            self.collection,
            summary.failed(),
            summary.reports.len()
        );
        for (source, count) in summary.by_source() {
            info!("  - {}: {} chunks", source, count);
        }

        Ok(summary)
    }

    async fn ingest_file(&self, path: &Path) -> Result<FileIngested> {
        let owned = path.to_path_buf();
        // PDF extraction is CPU bound
        let document = tokio::task::spawn_blocking(move || Document::from_file(owned))
            .await
            .map_err(|e| RagError::Document(e.to_string()))?
            .map_err(|e| RagError::Document(format!("{:#}", e)))?;

        let chunks = self.ingest_document(&document).await?;
        Ok(FileIngested {
            document_id: document.document_id,
            chunks,
        })
    }
}
