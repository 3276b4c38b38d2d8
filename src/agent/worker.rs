//! Worker agent: a bounded tool-calling loop for one question.
//!
//! The worker drives a conversation with the model, executing every tool
//! call the model requests (all calls in one turn run concurrently) and
//! feeding the results back, until the model answers in plain text or the
//! iteration ceiling is hit. A final formatting pass cleans the draft
//! answer; the whole run is traced in an execution log.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::agent::message::{
    ChatRequest, assistant_tool_calls_message, system_message, tool_message, user_message,
};
use crate::agent::prompt::build_parser_prompt;
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;
use crate::tools::{ExecutionLog, ToolCall, ToolCallRecord, ToolOutcome, ToolRegistry};

/// Tools advertised to the worker model.
pub const WORKER_TOOLS: &[&str] = &["retrieve_context", "url_request"];

/// Fixed answer when the loop hits its iteration ceiling.
pub const ITERATION_LIMIT_ANSWER: &str =
    "The question could not be answered within the allotted number of research steps.";

/// Base sampling temperature; a per-question offset is added on top.
const BASE_TEMPERATURE: f32 = 0.1;

/// Phases of the worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    /// Waiting for the model's next turn.
    AwaitingModel,
    /// Executing the tool calls from the last turn.
    ExecutingTools,
    /// The model produced a final text answer.
    Done,
    /// The iteration ceiling was reached with tools still pending.
    Exhausted,
}

/// What one worker run produced.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    /// The final answer.
    pub answer: String,
    /// Model turns consumed.
    pub iterations: usize,
    /// Whether the run ended by exhausting the iteration ceiling.
    pub exhausted: bool,
    /// Every tool call made, in execution order.
    pub log: ExecutionLog,
}

/// Answers one question through the bounded tool loop.
pub struct WorkerAgent {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    model: String,
    max_iterations: usize,
    worker_prompt: String,
    parser_prompt: String,
}

impl WorkerAgent {
    /// Creates a worker over the shared provider and registry.
    #[must_use]
    pub const fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        model: String,
        max_iterations: usize,
        worker_prompt: String,
        parser_prompt: String,
    ) -> Self {
        Self {
            provider,
            registry,
            model,
            max_iterations,
            worker_prompt,
            parser_prompt,
        }
    }

    /// Sampling temperature for `question`: a small offset derived from a
    /// SHA-256 fingerprint, so repeated runs of the same question sample
    /// identically while different questions decorrelate.
    #[must_use]
    pub fn temperature_for(question: &str) -> f32 {
        let digest = Sha256::digest(question.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let offset = u16::try_from(u64::from_be_bytes(raw) % 100).unwrap_or(0);
        BASE_TEMPERATURE + f32::from(offset) / 1000.0
    }

    fn fingerprint(question: &str) -> String {
        let digest = Sha256::digest(question.as_bytes());
        digest
            .iter()
            .take(4)
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Runs the loop for one question. `k` is the retrieval depth injected
    /// into `retrieve_context` calls that do not set their own.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; tool failures are folded into the
    /// conversation and never abort the run.
    pub async fn answer_question(
        &self,
        question: &str,
        k: usize,
    ) -> Result<WorkerOutcome, AgentError> {
        let fingerprint = Self::fingerprint(question);
        let mut request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&format!("{}\n\nSession: {fingerprint}", self.worker_prompt)),
                user_message(question),
            ],
            temperature: Some(Self::temperature_for(question)),
            max_tokens: None,
            tools: self.registry.definitions_for(WORKER_TOOLS),
        };

        let mut state = WorkerState::AwaitingModel;
        let mut iterations = 0usize;
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut draft = String::new();
        let mut log: ExecutionLog = Vec::new();

        loop {
            match state {
                WorkerState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        state = WorkerState::Exhausted;
                        continue;
                    }
                    iterations += 1;
                    let response = self.provider.chat(&request).await?;
                    if response.tool_calls.is_empty() {
                        draft = response.content;
                        state = WorkerState::Done;
                    } else {
                        debug!(
                            fingerprint,
                            iteration = iterations,
                            tool_count = response.tool_calls.len(),
                            "executing tool calls"
                        );
                        request
                            .messages
                            .push(assistant_tool_calls_message(response.tool_calls.clone()));
                        pending = response.tool_calls;
                        state = WorkerState::ExecutingTools;
                    }
                }
                WorkerState::ExecutingTools => {
                    let executions = pending.iter().map(|call| self.execute_call(call, k));
                    for (call, (arguments, outcome)) in
                        pending.iter().zip(join_all(executions).await)
                    {
                        request
                            .messages
                            .push(tool_message(&call.id, &outcome.as_message_content()));
                        log.push(ToolCallRecord {
                            tool: call.name.clone(),
                            arguments,
                            outcome,
                        });
                    }
                    pending = Vec::new();
                    state = WorkerState::AwaitingModel;
                }
                WorkerState::Done => {
                    let answer = self.parse_output(question, &draft).await;
                    debug!(fingerprint, iterations, "worker finished");
                    return Ok(WorkerOutcome {
                        answer,
                        iterations,
                        exhausted: false,
                        log,
                    });
                }
                WorkerState::Exhausted => {
                    warn!(fingerprint, iterations, "worker iteration ceiling reached");
                    return Ok(WorkerOutcome {
                        answer: ITERATION_LIMIT_ANSWER.to_string(),
                        iterations,
                        exhausted: true,
                        log,
                    });
                }
            }
        }
    }

    /// Executes one tool call, folding every failure into the outcome.
    async fn execute_call(&self, call: &ToolCall, k: usize) -> (Value, ToolOutcome) {
        let mut arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                return (
                    Value::String(call.arguments.clone()),
                    ToolOutcome::error(format!("invalid tool arguments: {e}")),
                );
            }
        };
        if call.name == "retrieve_context" {
            if let Some(object) = arguments.as_object_mut() {
                object.entry("k").or_insert_with(|| k.into());
            }
        }

        let outcome = match self.registry.invoke(&call.name, arguments.clone()).await {
            Ok(outcome) => outcome,
            // a hallucinated tool name comes back to the model as an error
            Err(e) => ToolOutcome::error(e.to_string()),
        };
        (arguments, outcome)
    }

    /// Formatting pass over the draft answer. Failure falls back to the
    /// draft unchanged.
    async fn parse_output(&self, question: &str, draft: &str) -> String {
        let request = ChatRequest::text(
            self.model.clone(),
            vec![
                system_message(&self.parser_prompt),
                user_message(&build_parser_prompt(question, draft)),
            ],
        );
        match self.provider.chat(&request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => draft.to_string(),
            Err(e) => {
                warn!(error = %e, "answer formatting failed, keeping draft");
                draft.to_string()
            }
        }
    }
}
