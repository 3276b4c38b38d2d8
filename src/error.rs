//! Error types for docquest.
//!
//! One enum per subsystem: [`AgentError`] for orchestration, tool dispatch
//! and LLM transport; [`StoreError`] for the vector store and snapshot
//! cache; [`ProcessError`] for document download/extraction/indexing.

use thiserror::Error;

/// Errors from the agent system (orchestrator, worker loop, tools, providers).
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the LLM provider.
    #[error("no API key configured (set OPENAI_API_KEY or DOCQUEST_API_KEY)")]
    ApiKeyMissing,

    /// The configured provider name has no implementation.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The unrecognized provider name.
        name: String,
    },

    /// An LLM API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error detail from the transport or SDK.
        message: String,
        /// HTTP status code, when one was received.
        status: Option<u16>,
    },

    /// A tool was invoked by a name that is not registered.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The unrecognized tool name.
        name: String,
    },

    /// A tool failed while executing.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Name of the failing tool.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// A failure in orchestration logic (classification, fan-out, joins).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure detail.
        message: String,
    },
}

/// Errors from the vector store, embedder, and snapshot cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing index rejected or failed an operation.
    #[error("vector store backend error: {message}")]
    Backend {
        /// Failure detail.
        message: String,
    },

    /// Embedding text into vectors failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Failure detail.
        message: String,
    },

    /// A snapshot could not be written or restored.
    #[error("snapshot error: {message}")]
    Snapshot {
        /// Failure detail.
        message: String,
    },

    /// Filesystem I/O failure in the cache layer.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or metadata (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from document processing (download, extraction, chunking, indexing).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The document URL could not be parsed.
    #[error("invalid document URL: {message}")]
    InvalidUrl {
        /// Parse failure detail.
        message: String,
    },

    /// The URL points at a file type the pipeline cannot ingest.
    #[error("unsupported file type: {extension}")]
    UnsupportedType {
        /// The rejected extension.
        extension: String,
    },

    /// Downloading the document failed.
    #[error("download failed: {message}")]
    Download {
        /// Failure detail.
        message: String,
    },

    /// Text extraction produced no usable content.
    #[error("document produced no extractable text")]
    EmptyDocument,

    /// The chunker rejected its configuration or input.
    #[error("chunking failed: {message}")]
    Chunking {
        /// Failure detail.
        message: String,
    },

    /// Storing chunks in the vector store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
