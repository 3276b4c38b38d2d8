//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::agent::{AgentConfig, Orchestrator, PromptSet, create_provider};
use crate::cli::output::{OutputFormat, format_cache_list, format_cache_stats, format_response};
use crate::cli::parser::{CacheCommands, Cli, Commands};
use crate::embedding::HashEmbedder;
use crate::process::ProcessingVariant;
use crate::store::VectorStore;
use crate::store::cache::{CacheKey, SnapshotCache, default_cache_dir};
use crate::store::memory::InMemoryStore;

/// Parameters for the ask command.
#[derive(Debug)]
pub struct AskParams<'a> {
    /// URL of the document to answer questions about.
    pub document: &'a str,
    /// The questions to answer.
    pub questions: &'a [String],
    /// Chunks to retrieve per question.
    pub top_k: Option<usize>,
    /// Model for worker agents and grounded generation.
    pub model: Option<&'a str>,
    /// Model for the mode-selection call.
    pub selector_model: Option<&'a str>,
    /// Disable the snapshot cache for this run.
    pub no_cache: bool,
    /// Directory for snapshot cache files.
    pub cache_dir: Option<&'a Path>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub async fn execute(cli: &Cli) -> anyhow::Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            document,
            questions,
            top_k,
            model,
            selector_model,
            no_cache,
            cache_dir,
            prompt_dir,
        } => {
            let params = AskParams {
                document,
                questions,
                top_k: *top_k,
                model: model.as_deref(),
                selector_model: selector_model.as_deref(),
                no_cache: *no_cache,
                cache_dir: cache_dir.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_ask(&params, format, cli.verbose).await
        }
        Commands::Cache(sub) => execute_cache(sub, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref()),
    }
}

async fn cmd_ask(
    params: &AskParams<'_>,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<String> {
    let mut builder = AgentConfig::builder();
    if let Some(k) = params.top_k {
        builder = builder.top_k(k);
    }
    if let Some(model) = params.model {
        builder = builder.chat_model(model);
    }
    if let Some(model) = params.selector_model {
        builder = builder.selector_model(model);
    }
    if params.no_cache {
        builder = builder.enable_caching(false);
    }
    if let Some(dir) = params.cache_dir {
        builder = builder.cache_dir(dir);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder
        .from_env()
        .build()
        .context("configuration failed (set OPENAI_API_KEY or DOCQUEST_API_KEY)")?;

    let provider = create_provider(&config)?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let embedder = Arc::new(HashEmbedder::default());
    let store: Arc<dyn VectorStore> = if config.enable_caching {
        let dir = config.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let cache = Arc::new(SnapshotCache::open(dir).context("failed to open snapshot cache")?);
        Arc::new(InMemoryStore::with_cache(embedder, cache))
    } else {
        Arc::new(InMemoryStore::new(embedder))
    };

    let orchestrator = Orchestrator::new(store, provider, &config, &prompts);
    let response = orchestrator.answer(params.document, params.questions).await?;
    Ok(format_response(
        &response,
        params.questions,
        format,
        verbose,
    ))
}

fn execute_cache(command: &CacheCommands, format: OutputFormat) -> anyhow::Result<String> {
    match command {
        CacheCommands::Stats { dir } => {
            let cache = open_cache(dir.as_deref())?;
            Ok(format_cache_stats(&cache.stats(), format))
        }
        CacheCommands::List { dir } => {
            let cache = open_cache(dir.as_deref())?;
            Ok(format_cache_list(&cache.list(), format))
        }
        CacheCommands::Clear { dir, url } => {
            let cache = open_cache(dir.as_deref())?;
            let removed = match url {
                Some(url) => {
                    // both renditions of the document
                    let mut removed = 0;
                    for variant in [ProcessingVariant::Fast, ProcessingVariant::Rich] {
                        removed += cache.clear(Some(&CacheKey::for_document(url, variant)))?;
                    }
                    removed
                }
                None => cache.clear(None)?,
            };
            Ok(format!("Removed {removed} snapshot(s)."))
        }
    }
}

fn cmd_init_prompts(dir: Option<&Path>) -> anyhow::Result<String> {
    let target = dir.map(PathBuf::from).map_or_else(
        || PromptSet::default_dir().context("cannot resolve the default prompt directory"),
        Ok,
    )?;
    let written =
        PromptSet::write_defaults(&target).context("failed to write prompt templates")?;
    if written.is_empty() {
        return Ok(format!(
            "All prompt templates already exist in {}",
            target.display()
        ));
    }
    let mut out = format!("Wrote {} prompt template(s):\n", written.len());
    for path in written {
        out.push_str(&format!("  {}\n", path.display()));
    }
    Ok(out)
}

fn open_cache(dir: Option<&Path>) -> anyhow::Result<SnapshotCache> {
    let dir = dir.map_or_else(default_cache_dir, PathBuf::from);
    SnapshotCache::open(dir).context("failed to open snapshot cache")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[tokio::test]
    async fn test_cache_stats_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let dir_arg = dir.path().to_string_lossy().to_string();
        let cli = cli_from(&["docquest", "cache", "stats", "--dir", &dir_arg]);
        let output = execute(&cli)
            .await
            .unwrap_or_else(|e| panic!("command failed: {e}"));
        assert!(output.contains("Entries: 0"));
    }

    #[tokio::test]
    async fn test_cache_clear_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let dir_arg = dir.path().to_string_lossy().to_string();
        let cli = cli_from(&["docquest", "cache", "clear", "--dir", &dir_arg]);
        let output = execute(&cli)
            .await
            .unwrap_or_else(|e| panic!("command failed: {e}"));
        assert!(output.contains("Removed 0"));
    }

    #[tokio::test]
    async fn test_init_prompts_writes_templates() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let dir_arg = dir.path().to_string_lossy().to_string();
        let cli = cli_from(&["docquest", "init-prompts", "--dir", &dir_arg]);
        let output = execute(&cli)
            .await
            .unwrap_or_else(|e| panic!("command failed: {e}"));
        assert!(output.contains("Wrote 5 prompt template(s)"));

        // a second run must not overwrite anything
        let cli = cli_from(&["docquest", "init-prompts", "--dir", &dir_arg]);
        let output = execute(&cli)
            .await
            .unwrap_or_else(|e| panic!("command failed: {e}"));
        assert!(output.contains("already exist"));
    }
}
