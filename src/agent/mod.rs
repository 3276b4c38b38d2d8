//! Agentic question-answering over documents.
//!
//! One request — a document URL plus a batch of questions — flows through
//! the [`Orchestrator`], which decides between two execution modes and
//! returns one answer per question:
//!
//! ```text
//! (URL, questions) → Orchestrator
//!   ├── classify URL, reset + preload the index
//!   ├── ModeSelector (LLM verdict: traditional | agentic)
//!   ├── traditional → one_shot_rag (retrieve + generate per question)
//!   └── agentic     → N concurrent WorkerAgents
//!         └── bounded tool loop over retrieve_context / url_request
//! ```
//!
//! Providers are pluggable behind [`LlmProvider`]; OpenAI-compatible APIs
//! are the built-in backend.

pub mod client;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod selector;
pub mod worker;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use orchestrator::{DECLINE_ANSWER, ExecutionRecord, Orchestrator, OrchestratorResponse};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use selector::{LlmModeSelector, ModeDescriptor, ModeSelector, ProcessingMode};
pub use worker::{WorkerAgent, WorkerOutcome};
