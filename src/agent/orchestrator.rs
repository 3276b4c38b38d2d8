//! Master orchestrator: one request in, one ordered answer list out.
//!
//! The orchestrator classifies the document URL, resets and preloads the
//! index, picks a processing mode, and then either runs the single-pass
//! pipeline or spawns one worker agent per question. Whatever happens
//! downstream, the response carries exactly one answer per question, in
//! question order, alongside a per-question execution log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::agent::selector::{LlmModeSelector, ModeDescriptor, ModeSelector, ProcessingMode};
use crate::agent::worker::WorkerAgent;
use crate::error::AgentError;
use crate::process::DocumentReference;
use crate::retrieval::QuestionDebug;
use crate::store::VectorStore;
use crate::store::consistency::{self, ConsistencyPolicy};
use crate::tools::{ExecutionLog, ToolRegistry};

/// Fixed answer for requests the orchestrator declines up front.
pub const DECLINE_ANSWER: &str =
    "Sorry, I cannot answer this question. If you have any other queries, feel free to ask.";

/// How one question was answered.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionRecord {
    /// The request was declined before any processing.
    Declined {
        /// Why the request was declined.
        reason: String,
    },
    /// Answered by the single-pass pipeline.
    Traditional {
        /// Retrieval trace for this question.
        debug: QuestionDebug,
    },
    /// Answered by a worker agent.
    Agentic {
        /// The question the worker ran.
        question: String,
        /// Every tool call the worker made.
        tool_calls: ExecutionLog,
    },
}

/// The orchestrator's answer to one request.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResponse {
    /// One answer per question, in question order.
    pub answers: Vec<String>,
    /// One execution record per question, in question order.
    pub execution_log: Vec<ExecutionRecord>,
    /// Whether the document was indexed before mode selection.
    pub preprocessed: bool,
    /// The mode that produced the answers.
    pub mode: String,
}

#[derive(Deserialize)]
struct ProbeChunk {
    content: String,
}

#[derive(Deserialize)]
struct ProbeResult {
    #[serde(default)]
    chunks: Vec<ProbeChunk>,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct ProcessResult {
    chunks_processed: usize,
}

#[derive(Deserialize)]
struct OneShotResult {
    answers: Vec<String>,
    debug: Vec<QuestionDebug>,
}

/// Routes document question-answering requests end to end.
pub struct Orchestrator {
    store: Arc<dyn VectorStore>,
    registry: Arc<ToolRegistry>,
    worker: Arc<WorkerAgent>,
    selector: Arc<dyn ModeSelector>,
    top_k: usize,
    probe_k: usize,
    clear_policy: ConsistencyPolicy,
}

impl Orchestrator {
    /// Builds the full production pipeline over the shared store and
    /// provider: standard tool registry, worker agent, and an LLM-backed
    /// mode selector.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        let registry = Arc::new(ToolRegistry::new(
            store.clone(),
            provider.clone(),
            config,
            prompts,
        ));
        let worker = Arc::new(WorkerAgent::new(
            provider.clone(),
            registry.clone(),
            config.chat_model.clone(),
            config.max_tool_iterations,
            prompts.worker.clone(),
            prompts.parser.clone(),
        ));
        let selector = Arc::new(LlmModeSelector::new(
            provider,
            config.selector_model.clone(),
            prompts.selector.clone(),
            config.snippet_limit,
        ));
        Self::with_parts(store, registry, worker, selector, config.top_k, config.probe_k)
    }

    /// Assembles an orchestrator from pre-built collaborators.
    #[must_use]
    pub fn with_parts(
        store: Arc<dyn VectorStore>,
        registry: Arc<ToolRegistry>,
        worker: Arc<WorkerAgent>,
        selector: Arc<dyn ModeSelector>,
        top_k: usize,
        probe_k: usize,
    ) -> Self {
        Self {
            store,
            registry,
            worker,
            selector,
            top_k,
            probe_k,
            clear_policy: ConsistencyPolicy::for_clear(),
        }
    }

    /// Answers `questions` about the document at `document_url`.
    ///
    /// The response always carries `questions.len()` answers in question
    /// order; per-question failures come back as answer strings, never as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] when the request is empty or
    /// the index cannot be reset, the only failures that make every answer
    /// meaningless at once.
    pub async fn answer(
        &self,
        document_url: &str,
        questions: &[String],
    ) -> Result<OrchestratorResponse, AgentError> {
        if questions.is_empty() {
            return Err(AgentError::Orchestration {
                message: "no questions provided".to_string(),
            });
        }

        let reference = match DocumentReference::classify(document_url) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(url = document_url, error = %e, "declining request");
                return Ok(Self::decline_all(questions, &e.to_string()));
            }
        };
        if let Some(extension) = reference.extension.as_deref() {
            if !reference.is_supported_file {
                let reason = format!("unsupported file type: {extension}");
                warn!(url = document_url, extension, "declining request");
                return Ok(Self::decline_all(questions, &reason));
            }
        }

        // every request starts from an empty index
        self.store
            .delete_all()
            .await
            .map_err(|e| AgentError::Orchestration {
                message: format!("failed to clear index: {e}"),
            })?;
        consistency::await_cleared(&*self.store, &self.clear_policy)
            .await
            .map_err(|e| AgentError::Orchestration {
                message: format!("failed to confirm clear: {e}"),
            })?;

        let mut preprocessed = false;
        let mut chunks_processed = None;
        if reference.is_supported_file {
            match self.preprocess(document_url).await {
                Ok(chunks) => {
                    preprocessed = true;
                    chunks_processed = Some(chunks);
                }
                Err(message) => {
                    warn!(url = document_url, error = message, "preprocessing failed");
                    let answer = format!("Failed to process document: {message}");
                    return Ok(OrchestratorResponse {
                        answers: vec![answer; questions.len()],
                        execution_log: questions
                            .iter()
                            .map(|_| ExecutionRecord::Declined {
                                reason: message.clone(),
                            })
                            .collect(),
                        preprocessed: false,
                        mode: "declined".to_string(),
                    });
                }
            }
        }

        let context_snippet = if preprocessed {
            self.probe(&questions[0]).await
        } else {
            String::new()
        };

        // a URL without an extension has nothing indexed to retrieve from,
        // so only the worker loop (which can fetch it live) makes sense
        let mode = if reference.extension.is_none() {
            ProcessingMode::Agentic
        } else {
            self.selector
                .select(&ModeDescriptor {
                    extension: reference.extension.clone(),
                    is_supported_file: reference.is_supported_file,
                    chunks_processed,
                    question_count: questions.len(),
                    context_snippet,
                })
                .await
        };
        info!(url = document_url, %mode, preprocessed, "mode selected");

        if mode == ProcessingMode::Traditional {
            if let Some(response) = self.run_traditional(document_url, questions, preprocessed).await
            {
                return Ok(response);
            }
            warn!(url = document_url, "single-pass pipeline failed, using workers");
        }

        Ok(self
            .run_agentic(document_url, questions, reference.is_supported_file, preprocessed)
            .await)
    }

    fn decline_all(questions: &[String], reason: &str) -> OrchestratorResponse {
        OrchestratorResponse {
            answers: vec![DECLINE_ANSWER.to_string(); questions.len()],
            execution_log: questions
                .iter()
                .map(|_| ExecutionRecord::Declined {
                    reason: reason.to_string(),
                })
                .collect(),
            preprocessed: false,
            mode: "declined".to_string(),
        }
    }

    /// Indexes the document with the fast loader, cache-first. Returns the
    /// chunk count or the failure message.
    async fn preprocess(&self, document_url: &str) -> Result<usize, String> {
        let outcome = self
            .registry
            .invoke(
                "process_document",
                json!({"document_url": document_url, "use_cache": true}),
            )
            .await
            .map_err(|e| e.to_string())?;
        if !outcome.success {
            return Err(outcome
                .error
                .unwrap_or_else(|| "unknown processing failure".to_string()));
        }
        outcome
            .result
            .and_then(|result| serde_json::from_value::<ProcessResult>(result).ok())
            .map(|r| r.chunks_processed)
            .ok_or_else(|| "malformed processing result".to_string())
    }

    /// Shallow retrieval over the first question, feeding the mode
    /// selector. Best-effort: failures yield an empty snippet.
    async fn probe(&self, question: &str) -> String {
        let outcome = match self
            .registry
            .invoke(
                "retrieve_context",
                json!({"questions": [question], "k": self.probe_k}),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "probe retrieval unavailable");
                return String::new();
            }
        };
        if !outcome.success {
            warn!(error = ?outcome.error, "probe retrieval failed");
            return String::new();
        }
        let Some(probe) = outcome
            .result
            .and_then(|result| serde_json::from_value::<ProbeResult>(result).ok())
        else {
            return String::new();
        };
        if probe.summary.is_empty() {
            probe
                .chunks
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            probe.summary
        }
    }

    /// Runs the single-pass pipeline. `None` means it failed and the
    /// caller should fall back to workers.
    async fn run_traditional(
        &self,
        document_url: &str,
        questions: &[String],
        preprocessed: bool,
    ) -> Option<OrchestratorResponse> {
        let outcome = match self
            .registry
            .invoke(
                "one_shot_rag",
                json!({
                    "document_url": document_url,
                    "questions": questions,
                    "k": self.top_k,
                }),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "single-pass pipeline unavailable");
                return None;
            }
        };
        if !outcome.success {
            warn!(error = ?outcome.error, "single-pass pipeline failed");
            return None;
        }
        let result: OneShotResult = outcome
            .result
            .and_then(|result| serde_json::from_value(result).ok())?;
        if result.answers.len() != questions.len() || result.debug.len() != questions.len() {
            warn!(
                expected = questions.len(),
                answers = result.answers.len(),
                "single-pass pipeline returned a mismatched batch"
            );
            return None;
        }
        Some(OrchestratorResponse {
            answers: result.answers,
            execution_log: result
                .debug
                .into_iter()
                .map(|debug| ExecutionRecord::Traditional { debug })
                .collect(),
            preprocessed,
            mode: ProcessingMode::Traditional.as_str().to_string(),
        })
    }

    /// Spawns one worker per question and collects answers in question
    /// order.
    async fn run_agentic(
        &self,
        document_url: &str,
        questions: &[String],
        is_supported_file: bool,
        preprocessed: bool,
    ) -> OrchestratorResponse {
        // workers retrieve best over the structure-preserving rendition;
        // losing it is survivable, the fast rendition is already indexed
        if is_supported_file {
            match self
                .registry
                .invoke(
                    "process_document",
                    json!({"document_url": document_url, "rich_loader": true, "use_cache": true}),
                )
                .await
            {
                Ok(outcome) if !outcome.success => {
                    warn!(error = ?outcome.error, "rich rendition unavailable");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "rich rendition unavailable"),
            }
        }

        // non-file resources are never indexed; those workers get the source
        // URL so the fetch tool can reach the document
        let handles: Vec<_> = questions
            .iter()
            .map(|question| {
                let worker = self.worker.clone();
                let task = if is_supported_file {
                    question.clone()
                } else {
                    format!("{question}\n\nSource document: {document_url}")
                };
                let k = self.top_k;
                tokio::spawn(async move { worker.answer_question(&task, k).await })
            })
            .collect();

        let mut answers = Vec::with_capacity(questions.len());
        let mut execution_log = Vec::with_capacity(questions.len());
        for (question, handle) in questions.iter().zip(handles) {
            match handle.await {
                Ok(Ok(outcome)) => {
                    answers.push(outcome.answer);
                    execution_log.push(ExecutionRecord::Agentic {
                        question: question.clone(),
                        tool_calls: outcome.log,
                    });
                }
                Ok(Err(e)) => {
                    warn!(question, error = %e, "worker failed");
                    answers.push(format!("Error: {e}"));
                    execution_log.push(ExecutionRecord::Agentic {
                        question: question.clone(),
                        tool_calls: Vec::new(),
                    });
                }
                Err(e) => {
                    warn!(question, error = %e, "worker task panicked");
                    answers.push(format!("Error: {e}"));
                    execution_log.push(ExecutionRecord::Agentic {
                        question: question.clone(),
                        tool_calls: Vec::new(),
                    });
                }
            }
        }

        OrchestratorResponse {
            answers,
            execution_log,
            preprocessed,
            mode: ProcessingMode::Agentic.as_str().to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, Role};
    use crate::embedding::HashEmbedder;
    use crate::store::memory::InMemoryStore;
    use crate::tools::{Tool, ToolCall, ToolOutcome};

    /// Tool that counts invocations and returns a canned outcome.
    struct CannedTool {
        name: &'static str,
        calls: AtomicUsize,
        outcome: ToolOutcome,
    }

    impl CannedTool {
        fn ok(name: &'static str, result: Value) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                outcome: ToolOutcome::ok(result),
            })
        }

        fn failing(name: &'static str, message: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                outcome: ToolOutcome::error(message),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Tool for CannedTool {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "Canned outcome."
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}, "additionalProperties": true})
        }

        async fn invoke(&self, _arguments: Value) -> ToolOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    /// Provider for worker runs: optional single tool round, then a final
    /// answer, failing whenever the question contains `fail_needle`.
    struct WorkerProvider {
        calls: AtomicUsize,
        tool_round: bool,
        fail_needle: Option<&'static str>,
    }

    impl WorkerProvider {
        fn answering() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                tool_round: false,
                fail_needle: None,
            })
        }
    }

    #[async_trait]
    impl crate::agent::provider::LlmProvider for WorkerProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let question = request
                .messages
                .iter()
                .find(|m| m.role == Role::User)
                .map_or(String::new(), |m| m.content.clone());
            if self
                .fail_needle
                .is_some_and(|needle| question.contains(needle))
            {
                return Err(AgentError::ApiRequest {
                    message: "mock outage".to_string(),
                    status: Some(503),
                });
            }
            if request.tools.is_empty() {
                // formatting pass
                return Ok(ChatResponse {
                    content: question,
                    tool_calls: Vec::new(),
                });
            }
            if self.tool_round && request.messages.len() == 2 {
                return Ok(ChatResponse {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_0".to_string(),
                        name: "retrieve_context".to_string(),
                        arguments: r#"{"questions":["probe"]}"#.to_string(),
                    }],
                });
            }
            Ok(ChatResponse {
                content: format!("worker answer: {question}"),
                tool_calls: Vec::new(),
            })
        }
    }

    /// Selector with a fixed verdict and a call counter.
    struct FixedSelector {
        mode: ProcessingMode,
        calls: AtomicUsize,
    }

    impl FixedSelector {
        fn traditional() -> Arc<Self> {
            Arc::new(Self {
                mode: ProcessingMode::Traditional,
                calls: AtomicUsize::new(0),
            })
        }

        fn agentic() -> Arc<Self> {
            Arc::new(Self {
                mode: ProcessingMode::Agentic,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModeSelector for FixedSelector {
        async fn select(&self, _descriptor: &ModeDescriptor) -> ProcessingMode {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.mode
        }
    }

    fn probe_result() -> Value {
        json!({
            "chunks": [{"content": "policy terms", "similarity_score": 0.9}],
            "summary": "an insurance policy document",
            "questions_searched": 1,
        })
    }

    fn process_result() -> Value {
        json!({
            "document_id": "doc-1",
            "chunks_processed": 12,
            "cache_used": false,
            "consistency_confirmed": true,
        })
    }

    fn orchestrator_over(
        tools: Vec<Arc<dyn Tool>>,
        provider: Arc<WorkerProvider>,
        selector: Arc<dyn ModeSelector>,
    ) -> Orchestrator {
        let store = Arc::new(InMemoryStore::new(Arc::new(HashEmbedder::default())));
        let registry = Arc::new(ToolRegistry::from_tools(tools));
        let worker = Arc::new(WorkerAgent::new(
            provider,
            registry.clone(),
            "mock-model".to_string(),
            15,
            "research".to_string(),
            "format".to_string(),
        ));
        Orchestrator::with_parts(store, registry, worker, selector, 10, 5)
    }

    fn questions(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| (*t).to_string()).collect()
    }

    #[tokio::test]
    async fn test_unsupported_extension_declines_every_question_without_tools() {
        let process = CannedTool::ok("process_document", process_result());
        let provider = WorkerProvider::answering();
        let orchestrator = orchestrator_over(
            vec![process.clone()],
            provider.clone(),
            FixedSelector::traditional(),
        );

        let qs = questions(&["what is covered?", "what is excluded?"]);
        let response = orchestrator
            .answer("https://example.com/archive.zip", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.answers, vec![DECLINE_ANSWER.to_string(); 2]);
        assert_eq!(response.mode, "declined");
        assert!(!response.preprocessed);
        assert_eq!(response.execution_log.len(), 2);
        assert!(response.execution_log.iter().all(|record| matches!(
            record,
            ExecutionRecord::Declined { reason } if reason.contains("zip")
        )));
        assert_eq!(process.calls(), 0, "declined requests touch no tools");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_declines() {
        let orchestrator = orchestrator_over(
            Vec::new(),
            WorkerProvider::answering(),
            FixedSelector::traditional(),
        );
        let qs = questions(&["anything?"]);
        let response = orchestrator
            .answer("not a url at all", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));
        assert_eq!(response.answers, vec![DECLINE_ANSWER.to_string()]);
        assert_eq!(response.mode, "declined");
    }

    #[tokio::test]
    async fn test_empty_question_list_is_an_error() {
        let orchestrator = orchestrator_over(
            Vec::new(),
            WorkerProvider::answering(),
            FixedSelector::traditional(),
        );
        let result = orchestrator
            .answer("https://example.com/policy.pdf", &[])
            .await;
        assert!(matches!(result, Err(AgentError::Orchestration { .. })));
    }

    #[tokio::test]
    async fn test_supported_document_traditional_path() {
        let process = CannedTool::ok("process_document", process_result());
        let retrieve = CannedTool::ok("retrieve_context", probe_result());
        let one_shot = CannedTool::ok(
            "one_shot_rag",
            json!({
                "answers": ["thirty days", "thirty six months"],
                "debug": [
                    {"question": "q1", "chunks_found": 2, "context": [], "answer": "thirty days"},
                    {"question": "q2", "chunks_found": 2, "context": [], "answer": "thirty six months"},
                ],
                "chunks": 12,
                "cache_used": false,
            }),
        );
        let provider = WorkerProvider::answering();
        let selector = FixedSelector::traditional();
        let orchestrator = orchestrator_over(
            vec![process.clone(), retrieve.clone(), one_shot.clone()],
            provider.clone(),
            selector.clone(),
        );

        let qs = questions(&["what is the grace period?", "what is the waiting period?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.mode, "traditional");
        assert!(response.preprocessed);
        assert_eq!(
            response.answers,
            vec!["thirty days".to_string(), "thirty six months".to_string()]
        );
        assert!(response.execution_log.iter().all(|record| matches!(
            record,
            ExecutionRecord::Traditional { .. }
        )));
        assert_eq!(process.calls(), 1);
        assert_eq!(retrieve.calls(), 1, "one probe search");
        assert_eq!(one_shot.calls(), 1);
        assert_eq!(selector.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            provider.calls.load(Ordering::SeqCst),
            0,
            "no workers on the traditional path"
        );
    }

    #[tokio::test]
    async fn test_preprocess_failure_reports_per_question() {
        let process = CannedTool::failing("process_document", "download failed: connection refused");
        let orchestrator = orchestrator_over(
            vec![process],
            WorkerProvider::answering(),
            FixedSelector::traditional(),
        );

        let qs = questions(&["q1?", "q2?", "q3?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.answers.len(), 3);
        assert!(response
            .answers
            .iter()
            .all(|a| a.starts_with("Failed to process document:")));
        assert!(!response.preprocessed);
    }

    #[tokio::test]
    async fn test_extensionless_url_forces_agentic_without_selector() {
        let process = CannedTool::ok("process_document", process_result());
        let selector = FixedSelector::traditional();
        let provider = WorkerProvider::answering();
        let orchestrator = orchestrator_over(
            vec![process.clone()],
            provider.clone(),
            selector.clone(),
        );

        let qs = questions(&["what does the page say?"]);
        let response = orchestrator
            .answer("https://example.com/reports/latest", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.mode, "agentic");
        assert!(!response.preprocessed);
        assert_eq!(selector.calls.load(Ordering::SeqCst), 0);
        assert_eq!(process.calls(), 0, "nothing to index without an extension");
        assert_eq!(response.answers.len(), 1);
        assert!(response.answers[0].contains("what does the page say?"));
        assert!(
            response.answers[0].contains("https://example.com/reports/latest"),
            "workers are told the source URL"
        );
    }

    #[tokio::test]
    async fn test_supported_file_worker_question_passes_unchanged() {
        let process = CannedTool::ok("process_document", process_result());
        let retrieve = CannedTool::ok("retrieve_context", probe_result());
        let provider = WorkerProvider::answering();
        let orchestrator =
            orchestrator_over(vec![process, retrieve], provider, FixedSelector::agentic());

        let qs = questions(&["what is the grace period?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.mode, "agentic");
        assert!(response.answers[0].contains("what is the grace period?"));
        assert!(
            !response.answers[0].contains("Source document:"),
            "indexed documents keep the question text as-is"
        );
    }

    #[tokio::test]
    async fn test_traditional_failure_falls_back_to_workers() {
        let process = CannedTool::ok("process_document", process_result());
        let retrieve = CannedTool::ok("retrieve_context", probe_result());
        let one_shot = CannedTool::failing("one_shot_rag", "index unavailable");
        let provider = WorkerProvider::answering();
        let orchestrator = orchestrator_over(
            vec![process.clone(), retrieve, one_shot],
            provider.clone(),
            FixedSelector::traditional(),
        );

        let qs = questions(&["what is covered?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.mode, "agentic");
        assert_eq!(response.answers.len(), 1);
        assert!(response.answers[0].contains("what is covered?"));
        // fast preprocess plus the rich rendition for the workers
        assert_eq!(process.calls(), 2);
        assert!(matches!(
            response.execution_log[0],
            ExecutionRecord::Agentic { .. }
        ));
    }

    #[tokio::test]
    async fn test_agentic_partial_failure_preserves_order_and_length() {
        let process = CannedTool::ok("process_document", process_result());
        let retrieve = CannedTool::ok("retrieve_context", probe_result());
        let provider = Arc::new(WorkerProvider {
            calls: AtomicUsize::new(0),
            tool_round: false,
            fail_needle: Some("second"),
        });
        let orchestrator = orchestrator_over(
            vec![process, retrieve],
            provider,
            FixedSelector::agentic(),
        );

        let qs = questions(&["first question?", "second question?", "third question?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert_eq!(response.mode, "agentic");
        assert_eq!(response.answers.len(), 3);
        assert!(response.answers[0].contains("first question?"));
        assert!(response.answers[1].starts_with("Error:"));
        assert!(response.answers[2].contains("third question?"));
        assert_eq!(response.execution_log.len(), 3);
        assert!(matches!(
            &response.execution_log[1],
            ExecutionRecord::Agentic { question, tool_calls }
                if question == "second question?" && tool_calls.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_agentic_workers_log_their_tool_calls() {
        let process = CannedTool::ok("process_document", process_result());
        let retrieve = CannedTool::ok("retrieve_context", probe_result());
        let provider = Arc::new(WorkerProvider {
            calls: AtomicUsize::new(0),
            tool_round: true,
            fail_needle: None,
        });
        let orchestrator = orchestrator_over(
            vec![process, retrieve.clone()],
            provider,
            FixedSelector::agentic(),
        );

        let qs = questions(&["what is covered?"]);
        let response = orchestrator
            .answer("https://example.com/policy.pdf", &qs)
            .await
            .unwrap_or_else(|e| panic!("orchestrator failed: {e}"));

        assert!(matches!(
            &response.execution_log[0],
            ExecutionRecord::Agentic { tool_calls, .. }
                if tool_calls.len() == 1 && tool_calls[0].tool == "retrieve_context"
        ));
    }
}
