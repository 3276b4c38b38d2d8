//! Document processing: classify, download, extract, chunk, index.
//!
//! [`DocumentReference`] classifies a URL once from its path. The
//! [`DocumentProcessor`] then downloads the bytes through the shared HTTP
//! client, extracts text with the loader selected by [`ProcessingVariant`],
//! chunks it, inserts the chunks in batches, and polls the store until the
//! new document is searchable.
//!
//! Rich file-format parsing (PDF layout, OCR, spreadsheets) is a
//! collaborator behind the [`DocumentLoader`] trait; the built-in loaders
//! handle textual payloads and stand in for everything else.

use std::fmt;
use std::sync::Arc;

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::{debug, info};
use url::Url;

use crate::error::ProcessError;
use crate::http;
use crate::store::cache::CacheKey;
use crate::store::consistency::{self, ConsistencyPolicy};
use crate::store::{ChunkMetadata, VectorStore};

/// File extensions the pipeline will preprocess.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "txt", "md", "xlsx", "xls", "jpg", "jpeg", "png",
];

/// Which extraction path produced (or will produce) the indexed text.
///
/// The variant participates in the snapshot cache key, so both renditions
/// of one document can be cached side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingVariant {
    /// Quick plain-text extraction, whitespace-normalized.
    Fast,
    /// Structure-preserving extraction (headings, lists, tables survive).
    Rich,
}

impl ProcessingVariant {
    /// Stable short name, used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Rich => "rich",
        }
    }

    /// The loader implementing this variant.
    #[must_use]
    pub fn loader(self) -> Box<dyn DocumentLoader> {
        match self {
            Self::Fast => Box::new(PlainTextLoader),
            Self::Rich => Box::new(RichTextLoader),
        }
    }
}

impl fmt::Display for ProcessingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document URL classified once, before any processing.
#[derive(Debug, Clone)]
pub struct DocumentReference {
    /// The source URL as given.
    pub url: String,
    /// Lowercased extension from the URL path, if the path has one.
    pub extension: Option<String>,
    /// Whether the extension is in [`SUPPORTED_EXTENSIONS`].
    pub is_supported_file: bool,
}

impl DocumentReference {
    /// Classify `url`. The extension comes from the final path segment, so
    /// query strings and fragments never influence the result.
    pub fn classify(url: &str) -> Result<Self, ProcessError> {
        let parsed = Url::parse(url).map_err(|e| ProcessError::InvalidUrl {
            message: format!("{url}: {e}"),
        })?;
        let extension = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .and_then(|segment| {
                segment
                    .rsplit_once('.')
                    .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
                    .map(|(_, ext)| ext.to_lowercase())
            });
        let is_supported_file = extension
            .as_deref()
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext));
        Ok(Self {
            url: url.to_string(),
            extension,
            is_supported_file,
        })
    }
}

/// Text extraction contract. Implementations for rich formats (PDF, office
/// documents, images with OCR) plug in here.
pub trait DocumentLoader: Send + Sync {
    /// Loader name for logs.
    fn name(&self) -> &'static str;

    /// Extract text from the raw document bytes.
    fn extract(&self, bytes: &[u8], reference: &DocumentReference) -> Result<String, ProcessError>;
}

/// Fast loader: lossy UTF-8 decode with whitespace normalization. Runs of
/// spaces collapse, runs of blank lines collapse to one paragraph break.
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn extract(&self, bytes: &[u8], _reference: &DocumentReference) -> Result<String, ProcessError> {
        let raw = String::from_utf8_lossy(bytes);
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current = String::new();
        for line in raw.lines() {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&collapsed);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }
        Ok(paragraphs.join("\n\n"))
    }
}

/// Rich loader: preserves line structure so headings, lists, and tables in
/// markdown-like payloads survive into the chunks.
pub struct RichTextLoader;

impl DocumentLoader for RichTextLoader {
    fn name(&self) -> &'static str {
        "rich-text"
    }

    fn extract(&self, bytes: &[u8], _reference: &DocumentReference) -> Result<String, ProcessError> {
        let raw = String::from_utf8_lossy(bytes);
        let trimmed: Vec<&str> = raw.lines().map(str::trim_end).collect();
        Ok(trimmed.join("\n").trim().to_string())
    }
}

/// Tunables for chunking and insertion.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,
    /// Chunks shorter than this are dropped as noise.
    pub min_chunk_length: usize,
    /// Chunks inserted per `add_documents` call.
    pub insert_batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_length: 20,
            insert_batch_size: 50,
        }
    }
}

/// What a processing run produced.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Identifier the chunks were indexed under. Derived deterministically
    /// from the URL and variant, so a cache restore yields the same id.
    pub document_id: String,
    /// Number of chunks inserted.
    pub chunks_processed: usize,
    /// Whether the searchability poll confirmed before its ceiling.
    pub consistency_confirmed: bool,
}

/// Download, extract, chunk, and index one document.
pub struct DocumentProcessor {
    store: Arc<dyn VectorStore>,
    config: ProcessorConfig,
    insert_policy: ConsistencyPolicy,
}

impl DocumentProcessor {
    /// Processor with the default post-insert polling policy.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, config: ProcessorConfig) -> Self {
        Self {
            store,
            config,
            insert_policy: ConsistencyPolicy::for_insert(),
        }
    }

    /// Override the post-insert polling policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConsistencyPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    /// The deterministic document id for a (URL, variant) pair.
    #[must_use]
    pub fn document_id_for(url: &str, variant: ProcessingVariant) -> String {
        CacheKey::for_document(url, variant).as_str().to_string()
    }

    /// Download `url` and index its text. Errors when the URL is invalid,
    /// unsupported, unreachable, or yields no extractable text.
    pub async fn process_url(
        &self,
        url: &str,
        variant: ProcessingVariant,
    ) -> Result<ProcessingOutcome, ProcessError> {
        let reference = DocumentReference::classify(url)?;
        if !reference.is_supported_file {
            return Err(ProcessError::UnsupportedType {
                extension: reference
                    .extension
                    .unwrap_or_else(|| "(none)".to_string()),
            });
        }
        let bytes = download(url).await?;
        let loader = variant.loader();
        let text = loader.extract(&bytes, &reference)?;
        debug!(
            url,
            %variant,
            loader = loader.name(),
            bytes = bytes.len(),
            chars = text.len(),
            "document extracted"
        );
        self.index_text(&reference, variant, &text).await
    }

    /// Chunk `text` and insert it under the deterministic document id,
    /// then poll for searchability.
    pub async fn index_text(
        &self,
        reference: &DocumentReference,
        variant: ProcessingVariant,
        text: &str,
    ) -> Result<ProcessingOutcome, ProcessError> {
        let chunks = self.chunk_text(text)?;
        if chunks.is_empty() {
            return Err(ProcessError::EmptyDocument);
        }
        let document_id = Self::document_id_for(&reference.url, variant);
        let total = chunks.len();
        let probe: String = chunks[0].chars().take(60).collect();

        for (batch_index, batch) in chunks.chunks(self.config.insert_batch_size).enumerate() {
            let offset = batch_index * self.config.insert_batch_size;
            let metadatas: Vec<ChunkMetadata> = (0..batch.len())
                .map(|i| ChunkMetadata {
                    document_id: document_id.clone(),
                    source: reference.url.clone(),
                    chunk_index: offset + i,
                    total_chunks: total,
                })
                .collect();
            self.store
                .add_documents(batch.to_vec(), metadatas)
                .await
                .map_err(ProcessError::Store)?;
        }

        let poll =
            consistency::await_searchable(&*self.store, &document_id, &probe, &self.insert_policy)
                .await
                .map_err(ProcessError::Store)?;
        info!(
            url = reference.url,
            %variant,
            chunks = total,
            confirmed = poll.confirmed,
            "document indexed"
        );
        Ok(ProcessingOutcome {
            document_id,
            chunks_processed: total,
            consistency_confirmed: poll.confirmed,
        })
    }

    fn chunk_text(&self, text: &str) -> Result<Vec<String>, ProcessError> {
        let chunk_config = ChunkConfig::new(self.config.chunk_size)
            .with_overlap(self.config.chunk_overlap)
            .map_err(|e| ProcessError::Chunking {
                message: e.to_string(),
            })?;
        let splitter = TextSplitter::new(chunk_config);
        Ok(splitter
            .chunks(text)
            .map(str::trim)
            .filter(|c| c.len() >= self.config.min_chunk_length)
            .map(str::to_string)
            .collect())
    }
}

async fn download(url: &str) -> Result<Vec<u8>, ProcessError> {
    let client = http::shared_client().await;
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| ProcessError::Download {
            message: e.to_string(),
        })?;
    let bytes = response.bytes().await.map_err(|e| ProcessError::Download {
        message: e.to_string(),
    })?;
    Ok(bytes.to_vec())
}
