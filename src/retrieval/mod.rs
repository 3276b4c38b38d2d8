//! Retrieval fan-out: N questions against the live index, concurrently.
//!
//! Every question runs its own similarity search and grounded generation.
//! Answers come back in question order, each question failing (or finding
//! nothing) independently of its siblings. A parallel debug trace records
//! what was retrieved; it never influences the answers.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::message::{system_message, user_message, ChatRequest};
use crate::agent::prompt::build_rag_prompt;
use crate::agent::provider::LlmProvider;
use crate::store::VectorStore;

/// Fixed answer for questions whose search returns nothing.
pub const NOT_FOUND_ANSWER: &str = "No relevant information found in the document.";

/// One retrieved chunk in the debug trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    /// Chunk text.
    pub content: String,
    /// Similarity score from the search.
    pub similarity_score: f32,
}

/// Debug trace for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDebug {
    /// The question as asked.
    pub question: String,
    /// How many chunks the search returned.
    pub chunks_found: usize,
    /// The retrieved chunks with scores.
    pub context: Vec<ContextChunk>,
    /// The answer produced for this question.
    pub answer: String,
}

/// Result of one fan-out run.
#[derive(Debug, Clone)]
pub struct FanoutOutcome {
    /// One answer per question, in question order.
    pub answers: Vec<String>,
    /// One debug entry per question, in question order.
    pub debug: Vec<QuestionDebug>,
}

/// Runs retrieval and grounded generation for a batch of questions.
pub struct RetrievalFanout {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn LlmProvider>,
    model: String,
    rag_prompt: String,
}

impl RetrievalFanout {
    /// Creates a fan-out service over the shared store and provider.
    #[must_use]
    pub const fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        model: String,
        rag_prompt: String,
    ) -> Self {
        Self {
            store,
            provider,
            model,
            rag_prompt,
        }
    }

    /// Answers every question concurrently against `document_id`.
    ///
    /// Output order equals input order. Per-question failures fold into
    /// error-string answers instead of aborting the batch.
    pub async fn run(&self, document_id: &str, questions: &[String], k: usize) -> FanoutOutcome {
        let tasks = questions
            .iter()
            .map(|question| self.answer_one(document_id, question, k));
        let debug = join_all(tasks).await;
        let answers = debug.iter().map(|d| d.answer.clone()).collect();
        FanoutOutcome { answers, debug }
    }

    async fn answer_one(&self, document_id: &str, question: &str, k: usize) -> QuestionDebug {
        let chunks = match self
            .store
            .search_with_score(question, k, Some(document_id))
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(question, error = %e, "retrieval failed");
                return QuestionDebug {
                    question: question.to_string(),
                    chunks_found: 0,
                    context: Vec::new(),
                    answer: format!("Error: {e}"),
                };
            }
        };

        let context: Vec<ContextChunk> = chunks
            .iter()
            .map(|c| ContextChunk {
                content: c.content.clone(),
                similarity_score: c.score,
            })
            .collect();

        if chunks.is_empty() {
            debug!(question, "no chunks retrieved");
            return QuestionDebug {
                question: question.to_string(),
                chunks_found: 0,
                context,
                answer: NOT_FOUND_ANSWER.to_string(),
            };
        }

        let joined = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let request = ChatRequest::text(
            self.model.clone(),
            vec![
                system_message(&self.rag_prompt),
                user_message(&build_rag_prompt(&joined, question)),
            ],
        );
        let answer = match self.provider.chat(&request).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(question, error = %e, "generation failed");
                format!("Error: {e}")
            }
        };

        QuestionDebug {
            question: question.to_string(),
            chunks_found: chunks.len(),
            context,
            answer,
        }
    }
}
