//! Document processing tool with variant-keyed snapshot caching.
//!
//! Wraps the [`DocumentProcessor`]: restore a cached snapshot when one
//! exists for the (URL, loader variant) pair, otherwise process from
//! source and — when the build is substantial enough — snapshot the
//! result for next time. Cache failures are never fatal; the tool falls
//! back to processing from source.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::process::{DocumentProcessor, ProcessingVariant};
use crate::store::VectorStore;
use crate::store::cache::CacheKey;
use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Deserialize)]
struct ProcessDocumentArgs {
    document_url: String,
    #[serde(default)]
    rich_loader: bool,
    #[serde(default = "default_use_cache")]
    use_cache: bool,
}

const fn default_use_cache() -> bool {
    true
}

/// Processes a document into the live index, cache-first.
pub struct ProcessDocumentTool {
    store: Arc<dyn VectorStore>,
    processor: Arc<DocumentProcessor>,
    caching_enabled: bool,
    cache_min_chunks: usize,
}

impl ProcessDocumentTool {
    /// Creates the tool over the shared store and processor.
    #[must_use]
    pub const fn new(
        store: Arc<dyn VectorStore>,
        processor: Arc<DocumentProcessor>,
        caching_enabled: bool,
        cache_min_chunks: usize,
    ) -> Self {
        Self {
            store,
            processor,
            caching_enabled,
            cache_min_chunks,
        }
    }

    async fn run(&self, args: ProcessDocumentArgs) -> ToolOutcome {
        let variant = if args.rich_loader {
            ProcessingVariant::Rich
        } else {
            ProcessingVariant::Fast
        };
        let key = CacheKey::for_document(&args.document_url, variant);
        let document_id = DocumentProcessor::document_id_for(&args.document_url, variant);

        let cache_eligible =
            args.use_cache && self.caching_enabled && self.store.supports_caching();

        if cache_eligible && self.store.has_cache(&key).await {
            match self.store.load_from_cache(&key).await {
                Ok(true) => {
                    let chunks = self.store.count().await.unwrap_or(0);
                    info!(url = args.document_url, %variant, chunks, "restored from cache");
                    return ToolOutcome::ok(json!({
                        "document_id": document_id,
                        "chunks_processed": chunks,
                        "cache_used": true,
                    }));
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(url = args.document_url, error = %e, "cache restore failed, reprocessing");
                }
            }
        }

        let outcome = match self.processor.process_url(&args.document_url, variant).await {
            Ok(outcome) => outcome,
            Err(e) => return ToolOutcome::error(e.to_string()),
        };

        if cache_eligible && outcome.chunks_processed >= self.cache_min_chunks {
            if let Err(e) = self.store.save_to_cache(&key, &args.document_url).await {
                warn!(url = args.document_url, error = %e, "snapshot save failed");
            }
        }

        ToolOutcome::ok(json!({
            "document_id": outcome.document_id,
            "chunks_processed": outcome.chunks_processed,
            "cache_used": false,
            "consistency_confirmed": outcome.consistency_confirmed,
        }))
    }
}

#[async_trait]
impl Tool for ProcessDocumentTool {
    fn name(&self) -> &'static str {
        "process_document"
    }

    fn description(&self) -> &'static str {
        "Download a document, extract its text, and index it for retrieval. \
         Reuses a cached index for the same document and loader when available."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "document_url": {
                    "type": "string",
                    "description": "URL of the document to process."
                },
                "rich_loader": {
                    "type": "boolean",
                    "description": "Use the structure-preserving loader. Defaults to false.",
                    "default": false
                },
                "use_cache": {
                    "type": "boolean",
                    "description": "Consult the snapshot cache before processing. Defaults to true.",
                    "default": true
                }
            },
            "required": ["document_url"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments: Value) -> ToolOutcome {
        let args: ProcessDocumentArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::error(format!("invalid arguments: {e}")),
        };
        self.run(args).await
    }
}
