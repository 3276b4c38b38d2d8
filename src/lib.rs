//! docquest: document question-answering orchestrator.
//!
//! Give it a document URL and a batch of questions; it classifies the
//! document, indexes it into an in-memory vector store (with a snapshot
//! cache keyed by URL and processing variant), and answers every question
//! through one of two modes:
//!
//! - **traditional** — a single-pass pipeline that retrieves context per
//!   question and generates grounded answers in one fan-out.
//! - **agentic** — one autonomous worker agent per question, each running
//!   a bounded tool-calling loop over the retrieval and fetch tools.
//!
//! An LLM-backed selector picks the mode per request; anything ambiguous
//! or broken falls back to the agentic mode. Whatever happens, the
//! response carries exactly one answer per question, in question order.
//!
//! # Layout
//!
//! - [`agent`] — orchestrator, worker loop, mode selector, providers.
//! - [`tools`] — the fixed function-calling tool set.
//! - [`retrieval`] — per-question retrieval and grounded generation.
//! - [`process`] — download, extract, chunk, index.
//! - [`store`] — vector store, snapshot cache, consistency polling.
//! - [`embedding`] — the embedding seam and the built-in hash embedder.
//! - [`cli`] — the command-line surface.

pub mod agent;
pub mod cli;
pub mod embedding;
pub mod error;
pub mod http;
pub mod process;
pub mod retrieval;
pub mod store;
pub mod tools;

// Re-export key types
pub use agent::{AgentConfig, Orchestrator, OrchestratorResponse, PromptSet};
pub use error::{AgentError, ProcessError, StoreError};
