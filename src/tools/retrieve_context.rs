//! Retrieval tool: similarity search over the live index plus a short
//! summary of what came back.
//!
//! Searches for every question concurrently and returns the scored chunks
//! in question order. The summary is advisory (the orchestrator uses it as
//! its mode-selection signal); a summary failure degrades to an empty
//! string rather than failing the retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::agent::message::{ChatRequest, system_message, user_message};
use crate::agent::prompt::build_summary_prompt;
use crate::agent::provider::LlmProvider;
use crate::store::VectorStore;
use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Deserialize)]
struct RetrieveContextArgs {
    questions: Vec<String>,
    k: Option<usize>,
}

/// Searches the live index and summarizes the retrieved context.
pub struct RetrieveContextTool {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn LlmProvider>,
    model: String,
    summary_prompt: String,
    default_k: usize,
}

impl RetrieveContextTool {
    /// Creates the tool over the shared store and provider.
    #[must_use]
    pub const fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        model: String,
        summary_prompt: String,
        default_k: usize,
    ) -> Self {
        Self {
            store,
            provider,
            model,
            summary_prompt,
            default_k,
        }
    }

    async fn run(&self, args: RetrieveContextArgs) -> ToolOutcome {
        if args.questions.is_empty() {
            return ToolOutcome::error("no questions provided");
        }
        let k = args.k.unwrap_or(self.default_k);

        let searches = args
            .questions
            .iter()
            .map(|q| self.store.search_with_score(q, k, None));
        let mut chunks = Vec::new();
        for (question, result) in args.questions.iter().zip(join_all(searches).await) {
            match result {
                Ok(scored) => {
                    debug!(question, hits = scored.len(), "context retrieved");
                    chunks.extend(scored);
                }
                Err(e) => return ToolOutcome::error(format!("search failed: {e}")),
            }
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let summary = if contents.is_empty() {
            String::new()
        } else {
            self.summarize(&contents).await
        };

        let chunk_values: Vec<Value> = chunks
            .iter()
            .map(|c| {
                json!({
                    "content": c.content,
                    "similarity_score": c.score,
                })
            })
            .collect();

        ToolOutcome::ok(json!({
            "chunks": chunk_values,
            "summary": summary,
            "questions_searched": args.questions.len(),
        }))
    }

    async fn summarize(&self, contents: &[String]) -> String {
        let request = ChatRequest::text(
            self.model.clone(),
            vec![
                system_message(&self.summary_prompt),
                user_message(&build_summary_prompt(contents)),
            ],
        );
        match self.provider.chat(&request).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "context summary failed");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Tool for RetrieveContextTool {
    fn name(&self) -> &'static str {
        "retrieve_context"
    }

    fn description(&self) -> &'static str {
        "Search the indexed document for passages relevant to one or more \
         questions. Returns scored passages and a short summary of them."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "Questions or queries to search for."
                },
                "k": {
                    "type": "integer",
                    "description": "Passages to retrieve per question."
                }
            },
            "required": ["questions"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments: Value) -> ToolOutcome {
        let args: RetrieveContextArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::error(format!("invalid arguments: {e}")),
        };
        self.run(args).await
    }
}
