//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docquest: document question-answering from the command line.
///
/// Point it at a document URL, ask questions, and it routes each request
/// through either a single-pass retrieval pipeline or an autonomous
/// tool-calling agent loop.
#[derive(Parser, Debug)]
#[command(name = "docquest")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer questions about a document.
    ///
    /// Downloads and indexes the document, then answers every question.
    /// Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  docquest ask -d https://example.com/policy.pdf -q "What is the grace period?"
  docquest ask -d https://example.com/policy.pdf \
      -q "What is covered?" -q "What is excluded?" -k 5
  docquest ask -d https://example.com/report -q "Summarize the findings" --no-cache
  docquest --format json ask -d https://example.com/a.pdf -q "..." | jq '.answers[]'
  OPENAI_API_KEY=sk-... docquest ask -d https://example.com/a.pdf -q "..."
"#)]
    Ask {
        /// URL of the document to answer questions about.
        #[arg(short, long)]
        document: String,

        /// A question to answer (repeatable).
        #[arg(short = 'q', long = "question", required = true)]
        questions: Vec<String>,

        /// Chunks to retrieve per question.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Model for worker agents and grounded generation.
        #[arg(long)]
        model: Option<String>,

        /// Model for the mode-selection call.
        #[arg(long)]
        selector_model: Option<String>,

        /// Disable the snapshot cache for this run.
        #[arg(long)]
        no_cache: bool,

        /// Directory for snapshot cache files.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Snapshot cache operations (stats, list, clear).
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Write default prompt templates to disk for customization.
    ///
    /// Creates markdown template files in the prompt directory so users
    /// can customize system prompts without recompiling.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  docquest init-prompts                       # Write to ~/.config/docquest/prompts/
  docquest init-prompts --dir ./my-prompts    # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/docquest/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Snapshot cache subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show aggregate cache statistics.
    Stats {
        /// Cache directory (defaults to the standard location).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List cached documents.
    List {
        /// Cache directory (defaults to the standard location).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Remove cached snapshots.
    #[command(after_help = r#"Examples:
  docquest cache clear                                  # Remove every snapshot
  docquest cache clear --url https://example.com/a.pdf  # Remove one document
"#)]
    Clear {
        /// Cache directory (defaults to the standard location).
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Remove only the snapshots for this document URL.
        #[arg(long)]
        url: Option<String>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_requires_a_question() {
        let result = Cli::try_parse_from(["docquest", "ask", "-d", "https://example.com/a.pdf"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ask_collects_repeated_questions() {
        let cli = Cli::try_parse_from([
            "docquest",
            "ask",
            "-d",
            "https://example.com/a.pdf",
            "-q",
            "first?",
            "-q",
            "second?",
        ])
        .unwrap_or_else(|e| panic!("parse failed: {e}"));
        match cli.command {
            Commands::Ask { questions, .. } => assert_eq!(questions.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
