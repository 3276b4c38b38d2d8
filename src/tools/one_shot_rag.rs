//! Single-pass retrieval pipeline packaged as a tool.
//!
//! Clears the live index, brings the document in (snapshot cache first,
//! source otherwise), then fans every question out through retrieval and
//! grounded generation. One call, one answer list.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::process::{DocumentProcessor, ProcessingVariant};
use crate::retrieval::RetrievalFanout;
use crate::store::VectorStore;
use crate::store::cache::CacheKey;
use crate::store::consistency::{self, ConsistencyPolicy};
use crate::tools::{Tool, ToolOutcome};

/// Default retrieval depth when the caller does not pass `k`.
const DEFAULT_K: usize = 10;

#[derive(Debug, Deserialize)]
struct OneShotRagArgs {
    document_url: String,
    questions: Vec<String>,
    #[serde(default = "default_k")]
    k: usize,
}

const fn default_k() -> usize {
    DEFAULT_K
}

/// Runs the whole traditional pipeline: clear, ingest, fan out, answer.
pub struct OneShotRagTool {
    store: Arc<dyn VectorStore>,
    processor: Arc<DocumentProcessor>,
    fanout: Arc<RetrievalFanout>,
    caching_enabled: bool,
    cache_min_chunks: usize,
    clear_policy: ConsistencyPolicy,
}

impl OneShotRagTool {
    /// Creates the tool over the shared store, processor, and fan-out.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        processor: Arc<DocumentProcessor>,
        fanout: Arc<RetrievalFanout>,
        caching_enabled: bool,
        cache_min_chunks: usize,
    ) -> Self {
        Self {
            store,
            processor,
            fanout,
            caching_enabled,
            cache_min_chunks,
            clear_policy: ConsistencyPolicy::for_clear(),
        }
    }

    async fn run(&self, args: OneShotRagArgs) -> ToolOutcome {
        if args.questions.is_empty() {
            return ToolOutcome::error("no questions provided");
        }

        if let Err(e) = self.store.delete_all().await {
            return ToolOutcome::error(format!("failed to clear index: {e}"));
        }
        if let Err(e) = consistency::await_cleared(&*self.store, &self.clear_policy).await {
            return ToolOutcome::error(format!("failed to confirm clear: {e}"));
        }

        let variant = ProcessingVariant::Fast;
        let key = CacheKey::for_document(&args.document_url, variant);
        let document_id = DocumentProcessor::document_id_for(&args.document_url, variant);

        let cache_eligible = self.caching_enabled && self.store.supports_caching();

        let mut cache_used = false;
        if cache_eligible && self.store.has_cache(&key).await {
            match self.store.load_from_cache(&key).await {
                Ok(loaded) => cache_used = loaded,
                Err(e) => {
                    warn!(url = args.document_url, error = %e, "cache restore failed, reprocessing");
                }
            }
        }

        let chunks = if cache_used {
            self.store.count().await.unwrap_or(0)
        } else {
            let chunks = match self.processor.process_url(&args.document_url, variant).await {
                Ok(outcome) => outcome.chunks_processed,
                Err(e) => return ToolOutcome::error(e.to_string()),
            };
            if cache_eligible && chunks >= self.cache_min_chunks {
                if let Err(e) = self.store.save_to_cache(&key, &args.document_url).await {
                    warn!(url = args.document_url, error = %e, "snapshot save failed");
                }
            }
            chunks
        };

        info!(
            url = args.document_url,
            questions = args.questions.len(),
            chunks,
            cache_used,
            "running single-pass pipeline"
        );
        let outcome = self
            .fanout
            .run(&document_id, &args.questions, args.k)
            .await;

        match serde_json::to_value(&outcome.debug) {
            Ok(debug) => ToolOutcome::ok(json!({
                "answers": outcome.answers,
                "debug": debug,
                "chunks": chunks,
                "cache_used": cache_used,
            })),
            Err(e) => ToolOutcome::error(format!("failed to encode debug trace: {e}")),
        }
    }
}

#[async_trait]
impl Tool for OneShotRagTool {
    fn name(&self) -> &'static str {
        "one_shot_rag"
    }

    fn description(&self) -> &'static str {
        "Answer a batch of questions about a document in one pass: index the \
         document, retrieve context per question, and generate grounded answers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "document_url": {
                    "type": "string",
                    "description": "URL of the document to answer questions about."
                },
                "questions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "The questions to answer."
                },
                "k": {
                    "type": "integer",
                    "description": "Chunks to retrieve per question. Defaults to 10.",
                    "default": DEFAULT_K
                }
            },
            "required": ["document_url", "questions"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments: Value) -> ToolOutcome {
        let args: OneShotRagArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::error(format!("invalid arguments: {e}")),
        };
        self.run(args).await
    }
}
