//! Tool types and the fixed tool registry.
//!
//! Tools expose pipeline operations (fetching, processing, retrieval, the
//! single-pass pipeline) as function-calling targets. The registry is
//! constructed once with the full set and never changes afterwards; asking
//! it for a name it does not know is a hard error, not a lookup miss.

pub mod one_shot_rag;
pub mod process_document;
pub mod retrieve_context;
pub mod url_request;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;
use crate::process::DocumentProcessor;
use crate::retrieval::RetrievalFanout;
use crate::store::VectorStore;

pub use one_shot_rag::OneShotRagTool;
pub use process_document::ProcessDocumentTool;
pub use retrieve_context::RetrieveContextTool;
pub use url_request::UrlRequestTool;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a registry entry).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The uniform result of executing a tool.
///
/// Tool execution never propagates errors: failures are folded into an
/// unsuccessful outcome so one bad call cannot take down a whole turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the tool completed successfully.
    pub success: bool,
    /// Structured result payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure description on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// A successful outcome carrying `result`.
    #[must_use]
    pub const fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// A failed outcome carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Renders this outcome as the content of a tool-role message.
    #[must_use]
    pub fn as_message_content(&self) -> String {
        if self.success {
            self.result
                .as_ref()
                .map(std::string::ToString::to_string)
                .unwrap_or_else(|| "null".to_string())
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("unknown failure")
            )
        }
    }
}

/// One entry in a question's execution log.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Name of the invoked tool.
    pub tool: String,
    /// Arguments the tool was invoked with.
    pub arguments: Value,
    /// What the invocation produced.
    pub outcome: ToolOutcome,
}

/// Ordered trace of every tool call made while answering one question.
pub type ExecutionLog = Vec<ToolCallRecord>;

/// Contract every registered tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name of the tool.
    fn name(&self) -> &'static str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &'static str;

    /// JSON Schema of the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Executes the tool. Never returns an error: failures become
    /// unsuccessful [`ToolOutcome`]s.
    async fn invoke(&self, arguments: Value) -> ToolOutcome;

    /// The definition advertised to the model for this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The fixed set of tools, resolved by name.
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Builds the standard registry: `url_request`, `process_document`,
    /// `retrieve_context`, and `one_shot_rag`, wired to the shared store
    /// and provider.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        let processor = Arc::new(DocumentProcessor::new(
            store.clone(),
            config.processor_config(),
        ));
        let fanout = Arc::new(RetrievalFanout::new(
            store.clone(),
            provider.clone(),
            config.chat_model.clone(),
            prompts.rag.clone(),
        ));
        Self::from_tools(vec![
            Arc::new(UrlRequestTool::new()),
            Arc::new(ProcessDocumentTool::new(
                store.clone(),
                processor.clone(),
                config.enable_caching,
                config.cache_min_chunks,
            )),
            Arc::new(RetrieveContextTool::new(
                store.clone(),
                provider,
                config.chat_model.clone(),
                prompts.summary.clone(),
                config.top_k,
            )),
            Arc::new(OneShotRagTool::new(
                store,
                processor,
                fanout,
                config.enable_caching,
                config.cache_min_chunks,
            )),
        ])
    }

    /// Builds a registry from an explicit tool set.
    #[must_use]
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name(), t)).collect(),
        }
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for the named tools, in the given order. Unknown names
    /// are skipped (the caller chose the advertised subset up front).
    #[must_use]
    pub fn definitions_for(&self, names: &[&str]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name).map(|t| t.definition()))
            .collect()
    }

    /// Invokes the named tool.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownTool`] when `name` is not registered.
    /// Tool-level failures do NOT error: they come back as unsuccessful
    /// [`ToolOutcome`]s.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError> {
        let tool = self.tools.get(name).ok_or_else(|| AgentError::UnknownTool {
            name: name.to_string(),
        })?;
        debug!(tool = name, "invoking tool");
        Ok(tool.invoke(arguments).await)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.tools.keys().collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
