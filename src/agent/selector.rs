//! Processing mode selection.
//!
//! The orchestrator chooses between a single-pass pipeline and the
//! autonomous worker loop through the narrow [`ModeSelector`] interface.
//! The decision is best-effort advice: any failure, timeout, or
//! unparseable reply deterministically falls back to the agentic mode,
//! which always works even when it costs more.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agent::message::{ChatRequest, system_message, user_message};
use crate::agent::prompt::build_selector_prompt;
use crate::agent::provider::LlmProvider;

/// How a request will be processed. Closed set: every selector reply maps
/// onto one of these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Single-pass retrieval-then-generate pipeline.
    Traditional,
    /// Bounded autonomous tool-calling loop per question.
    Agentic,
}

impl ProcessingMode {
    /// Stable name for logs and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Traditional => "traditional",
            Self::Agentic => "agentic",
        }
    }

    /// Parses a selector reply. Tolerates case and surrounding noise;
    /// anything that does not clearly name a mode is `None`.
    #[must_use]
    pub fn parse(reply: &str) -> Option<Self> {
        let normalized = reply.trim().to_lowercase();
        if normalized == "traditional" || normalized == "agentic" {
            return Some(if normalized == "traditional" {
                Self::Traditional
            } else {
                Self::Agentic
            });
        }
        // a chatty model may wrap the token in a sentence
        match (
            normalized.contains("traditional"),
            normalized.contains("agentic"),
        ) {
            (true, false) => Some(Self::Traditional),
            (false, true) => Some(Self::Agentic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a selector may consider about the request.
#[derive(Debug, Clone)]
pub struct ModeDescriptor {
    /// Lowercased extension from the URL path, if any.
    pub extension: Option<String>,
    /// Whether the extension is a supported file type.
    pub is_supported_file: bool,
    /// Chunks the preprocessing pass produced, when it ran.
    pub chunks_processed: Option<usize>,
    /// Number of questions in the request.
    pub question_count: usize,
    /// A bounded sample of retrieved context.
    pub context_snippet: String,
}

/// Narrow interface for the mode decision.
#[async_trait]
pub trait ModeSelector: Send + Sync {
    /// Chooses the processing mode for a request. Infallible by contract:
    /// implementations fold their own failures into [`ProcessingMode::Agentic`].
    async fn select(&self, descriptor: &ModeDescriptor) -> ProcessingMode;
}

/// Selector that asks an LLM for a one-word verdict.
pub struct LlmModeSelector {
    provider: Arc<dyn LlmProvider>,
    model: String,
    prompt: String,
    snippet_limit: usize,
}

impl LlmModeSelector {
    /// Creates a selector over the given provider and model.
    #[must_use]
    pub const fn new(
        provider: Arc<dyn LlmProvider>,
        model: String,
        prompt: String,
        snippet_limit: usize,
    ) -> Self {
        Self {
            provider,
            model,
            prompt,
            snippet_limit,
        }
    }
}

#[async_trait]
impl ModeSelector for LlmModeSelector {
    async fn select(&self, descriptor: &ModeDescriptor) -> ProcessingMode {
        let snippet: String = descriptor
            .context_snippet
            .chars()
            .take(self.snippet_limit)
            .collect();
        let request = ChatRequest::text(
            self.model.clone(),
            vec![
                system_message(&self.prompt),
                user_message(&build_selector_prompt(
                    descriptor.extension.as_deref(),
                    descriptor.is_supported_file,
                    descriptor.chunks_processed,
                    descriptor.question_count,
                    &snippet,
                )),
            ],
        );

        match self.provider.chat(&request).await {
            Ok(response) => match ProcessingMode::parse(&response.content) {
                Some(mode) => {
                    debug!(%mode, "mode selected");
                    mode
                }
                None => {
                    warn!(reply = response.content, "unparseable mode reply, using agentic");
                    ProcessingMode::Agentic
                }
            },
            Err(e) => {
                warn!(error = %e, "mode selection failed, using agentic");
                ProcessingMode::Agentic
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::agent::message::ChatResponse;
    use crate::error::AgentError;

    struct CannedProvider {
        reply: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.reply.clone().map_or_else(
                || {
                    Err(AgentError::ApiRequest {
                        message: "mock outage".to_string(),
                        status: Some(500),
                    })
                },
                |content| {
                    Ok(ChatResponse {
                        content,
                        tool_calls: Vec::new(),
                    })
                },
            )
        }
    }

    fn descriptor() -> ModeDescriptor {
        ModeDescriptor {
            extension: Some("pdf".to_string()),
            is_supported_file: true,
            chunks_processed: Some(40),
            question_count: 2,
            context_snippet: "policy terms and conditions".to_string(),
        }
    }

    #[test_case("traditional", Some(ProcessingMode::Traditional); "exact token")]
    #[test_case("  Agentic \n", Some(ProcessingMode::Agentic); "case and whitespace")]
    #[test_case("I would choose traditional here.", Some(ProcessingMode::Traditional); "wrapped in prose")]
    #[test_case("either traditional or agentic", None; "ambiguous")]
    #[test_case("hybrid", None; "unknown token")]
    #[test_case("", None; "empty")]
    fn test_parse(reply: &str, expected: Option<ProcessingMode>) {
        assert_eq!(ProcessingMode::parse(reply), expected);
    }

    #[tokio::test]
    async fn test_selector_honors_clear_verdict() {
        let selector = LlmModeSelector::new(
            Arc::new(CannedProvider {
                reply: Some("traditional".to_string()),
            }),
            "mock-model".to_string(),
            String::new(),
            500,
        );
        assert_eq!(
            selector.select(&descriptor()).await,
            ProcessingMode::Traditional
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_defaults_to_agentic() {
        let selector = LlmModeSelector::new(
            Arc::new(CannedProvider {
                reply: Some("whatever you prefer".to_string()),
            }),
            "mock-model".to_string(),
            String::new(),
            500,
        );
        assert_eq!(selector.select(&descriptor()).await, ProcessingMode::Agentic);
    }

    #[tokio::test]
    async fn test_provider_failure_defaults_to_agentic() {
        let selector = LlmModeSelector::new(
            Arc::new(CannedProvider { reply: None }),
            "mock-model".to_string(),
            String::new(),
            500,
        );
        assert_eq!(selector.select(&descriptor()).await, ProcessingMode::Agentic);
    }
}
