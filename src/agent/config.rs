//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;

use crate::error::AgentError;
use crate::process::ProcessorConfig;

/// Default maximum worker tool-loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 15;
/// Default retrieval depth per question.
const DEFAULT_TOP_K: usize = 10;
/// Retrieval depth for the mode-selection probe.
const DEFAULT_PROBE_K: usize = 5;
/// Characters of retrieved context shown to the mode selector.
const DEFAULT_SNIPPET_LIMIT: usize = 500;
/// Default minimum chunk count before a build qualifies for caching.
const DEFAULT_CACHE_MIN_CHUNKS: usize = 5;
/// Default chunk size in characters.
const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default chunk overlap in characters.
const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default minimum chunk length; shorter chunks are dropped as noise.
const DEFAULT_MIN_CHUNK_LENGTH: usize = 20;
/// Default chunks per insert batch.
const DEFAULT_INSERT_BATCH_SIZE: usize = 50;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for worker agents and grounded generation.
    pub chat_model: String,
    /// Model for the mode-selection call.
    pub selector_model: String,
    /// Maximum worker tool-loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Retrieval depth (top-k) per question.
    pub top_k: usize,
    /// Retrieval depth for the mode-selection probe search.
    pub probe_k: usize,
    /// Characters of retrieved context shown to the mode selector.
    pub snippet_limit: usize,
    /// Whether snapshot caching is enabled.
    pub enable_caching: bool,
    /// Minimum chunk count before a build qualifies for caching.
    pub cache_min_chunks: usize,
    /// Directory for snapshot cache files.
    pub cache_dir: Option<PathBuf>,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,
    /// Chunks shorter than this are dropped as noise.
    pub min_chunk_length: usize,
    /// Chunks per insert batch.
    pub insert_batch_size: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, prompts load from markdown files in this directory,
    /// falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// The chunking/insertion slice of this configuration.
    #[must_use]
    pub const fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            min_chunk_length: self.min_chunk_length,
            insert_batch_size: self.insert_batch_size,
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    selector_model: Option<String>,
    max_tool_iterations: Option<usize>,
    top_k: Option<usize>,
    probe_k: Option<usize>,
    snippet_limit: Option<usize>,
    enable_caching: Option<bool>,
    cache_min_chunks: Option<usize>,
    cache_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    min_chunk_length: Option<usize>,
    insert_batch_size: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("DOCQUEST_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("DOCQUEST_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("DOCQUEST_BASE_URL"))
                .ok();
        }
        if self.chat_model.is_none() {
            self.chat_model = std::env::var("DOCQUEST_CHAT_MODEL").ok();
        }
        if self.selector_model.is_none() {
            self.selector_model = std::env::var("DOCQUEST_SELECTOR_MODEL").ok();
        }
        if self.max_tool_iterations.is_none() {
            self.max_tool_iterations = std::env::var("DOCQUEST_MAX_TOOL_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.top_k.is_none() {
            self.top_k = std::env::var("DOCQUEST_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.probe_k.is_none() {
            self.probe_k = std::env::var("DOCQUEST_PROBE_K")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.snippet_limit.is_none() {
            self.snippet_limit = std::env::var("DOCQUEST_SNIPPET_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.enable_caching.is_none() {
            self.enable_caching = std::env::var("DOCQUEST_ENABLE_CACHING")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.cache_min_chunks.is_none() {
            self.cache_min_chunks = std::env::var("DOCQUEST_CACHE_MIN_CHUNKS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.cache_dir.is_none() {
            self.cache_dir = std::env::var("DOCQUEST_CACHE_DIR").ok().map(PathBuf::from);
        }
        if self.chunk_size.is_none() {
            self.chunk_size = std::env::var("DOCQUEST_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.chunk_overlap.is_none() {
            self.chunk_overlap = std::env::var("DOCQUEST_CHUNK_OVERLAP")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.min_chunk_length.is_none() {
            self.min_chunk_length = std::env::var("DOCQUEST_MIN_CHUNK_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.insert_batch_size.is_none() {
            self.insert_batch_size = std::env::var("DOCQUEST_INSERT_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("DOCQUEST_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the worker/generation model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the mode-selector model.
    #[must_use]
    pub fn selector_model(mut self, model: impl Into<String>) -> Self {
        self.selector_model = Some(model.into());
        self
    }

    /// Sets the maximum worker tool-loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the retrieval depth per question.
    #[must_use]
    pub const fn top_k(mut self, n: usize) -> Self {
        self.top_k = Some(n);
        self
    }

    /// Sets the mode-selection probe depth.
    #[must_use]
    pub const fn probe_k(mut self, n: usize) -> Self {
        self.probe_k = Some(n);
        self
    }

    /// Sets the selector context snippet limit.
    #[must_use]
    pub const fn snippet_limit(mut self, n: usize) -> Self {
        self.snippet_limit = Some(n);
        self
    }

    /// Enables or disables snapshot caching.
    #[must_use]
    pub const fn enable_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = Some(enabled);
        self
    }

    /// Sets the minimum chunk count for caching.
    #[must_use]
    pub const fn cache_min_chunks(mut self, n: usize) -> Self {
        self.cache_min_chunks = Some(n);
        self
    }

    /// Sets the snapshot cache directory.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets the chunk size.
    #[must_use]
    pub const fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Sets the chunk overlap.
    #[must_use]
    pub const fn chunk_overlap(mut self, n: usize) -> Self {
        self.chunk_overlap = Some(n);
        self
    }

    /// Sets the minimum chunk length.
    #[must_use]
    pub const fn min_chunk_length(mut self, n: usize) -> Self {
        self.min_chunk_length = Some(n);
        self
    }

    /// Sets the insert batch size.
    #[must_use]
    pub const fn insert_batch_size(mut self, n: usize) -> Self {
        self.insert_batch_size = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            chat_model: self.chat_model.unwrap_or_else(|| "gpt-4o".to_string()),
            selector_model: self
                .selector_model
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            probe_k: self.probe_k.unwrap_or(DEFAULT_PROBE_K),
            snippet_limit: self.snippet_limit.unwrap_or(DEFAULT_SNIPPET_LIMIT),
            enable_caching: self.enable_caching.unwrap_or(true),
            cache_min_chunks: self.cache_min_chunks.unwrap_or(DEFAULT_CACHE_MIN_CHUNKS),
            cache_dir: self.cache_dir,
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: self.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            min_chunk_length: self.min_chunk_length.unwrap_or(DEFAULT_MIN_CHUNK_LENGTH),
            insert_batch_size: self.insert_batch_size.unwrap_or(DEFAULT_INSERT_BATCH_SIZE),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.max_tool_iterations, 15);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.probe_k, 5);
        assert!(config.enable_caching);
        assert_eq!(config.cache_min_chunks, DEFAULT_CACHE_MIN_CHUNKS);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .chat_model("gpt-4o-mini")
            .max_tool_iterations(5)
            .top_k(3)
            .enable_caching(false)
            .chunk_size(500)
            .chunk_overlap(50)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.max_tool_iterations, 5);
        assert_eq!(config.top_k, 3);
        assert!(!config.enable_caching);
        let processor = config.processor_config();
        assert_eq!(processor.chunk_size, 500);
        assert_eq!(processor.chunk_overlap, 50);
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_from_env_reads_tuning_knobs() {
        // SAFETY: variable names no other test reads or writes
        unsafe {
            std::env::set_var("DOCQUEST_PROBE_K", "7");
            std::env::set_var("DOCQUEST_SNIPPET_LIMIT", "900");
            std::env::set_var("DOCQUEST_MIN_CHUNK_LENGTH", "25");
            std::env::set_var("DOCQUEST_INSERT_BATCH_SIZE", "64");
        }
        let config = AgentConfig::builder()
            .api_key("key")
            .from_env()
            .build()
            .unwrap_or_else(|_| unreachable!());
        // SAFETY: same test-local variable names
        unsafe {
            std::env::remove_var("DOCQUEST_PROBE_K");
            std::env::remove_var("DOCQUEST_SNIPPET_LIMIT");
            std::env::remove_var("DOCQUEST_MIN_CHUNK_LENGTH");
            std::env::remove_var("DOCQUEST_INSERT_BATCH_SIZE");
        }
        assert_eq!(config.probe_k, 7);
        assert_eq!(config.snippet_limit, 900);
        let processor = config.processor_config();
        assert_eq!(processor.min_chunk_length, 25);
        assert_eq!(processor.insert_batch_size, 64);
    }
}
