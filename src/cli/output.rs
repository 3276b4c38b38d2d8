//! Output formatting for CLI results.
//!
//! Every command renders either a human-readable text block or JSON for
//! scripting, selected by the global `--format` flag.

use std::fmt::Write;

use serde_json::json;

use crate::agent::{ExecutionRecord, OrchestratorResponse};
use crate::store::cache::{CacheEntry, CacheStats};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for anything unknown.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Renders an orchestrator response.
#[must_use]
pub fn format_response(
    response: &OrchestratorResponse,
    questions: &[String],
    format: OutputFormat,
    verbose: bool,
) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(response)
            .unwrap_or_else(|_| json!({"answers": response.answers}).to_string());
    }

    let mut out = String::new();
    for (i, (question, answer)) in questions.iter().zip(&response.answers).enumerate() {
        let _ = writeln!(out, "Q{}: {question}", i + 1);
        let _ = writeln!(out, "A{}: {answer}", i + 1);
        if verbose {
            match response.execution_log.get(i) {
                Some(ExecutionRecord::Agentic { tool_calls, .. }) => {
                    let _ = writeln!(out, "    tool calls: {}", tool_calls.len());
                    for record in tool_calls {
                        let status = if record.outcome.success { "ok" } else { "error" };
                        let _ = writeln!(out, "      {} ({status})", record.tool);
                    }
                }
                Some(ExecutionRecord::Traditional { debug }) => {
                    let _ = writeln!(out, "    chunks retrieved: {}", debug.chunks_found);
                }
                Some(ExecutionRecord::Declined { reason }) => {
                    let _ = writeln!(out, "    declined: {reason}");
                }
                None => {}
            }
        }
        if i + 1 < questions.len() {
            out.push('\n');
        }
    }
    let _ = writeln!(
        out,
        "\nmode: {} (preprocessed: {})",
        response.mode, response.preprocessed
    );
    out
}

/// Renders cache statistics.
#[must_use]
pub fn format_cache_stats(stats: &CacheStats, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_string());
    }
    format!(
        "Cache directory: {}\nEntries: {}\nSnapshot files: {}\nTotal size: {} bytes",
        stats.directory.display(),
        stats.entries,
        stats.files,
        stats.total_bytes
    )
}

/// Renders the cached document list.
#[must_use]
pub fn format_cache_list(entries: &[(String, CacheEntry)], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let items: Vec<_> = entries
            .iter()
            .map(|(key, entry)| {
                json!({
                    "key": key,
                    "document_url": entry.document_url,
                    "created_at": entry.created_at,
                })
            })
            .collect();
        return serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());
    }
    if entries.is_empty() {
        return "Cache is empty.".to_string();
    }
    let mut out = String::new();
    for (key, entry) in entries {
        let _ = writeln!(out, "{key}  {}", entry.document_url);
    }
    let _ = write!(out, "{} cached snapshot(s)", entries.len());
    out
}
