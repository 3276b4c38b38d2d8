//! HTTP fetch tool with content-type negotiation.
//!
//! Fetches a URL through the process-wide shared client and shapes the
//! body by content type: JSON parses to a structured value, textual types
//! pass through as text, and anything else is base64-encoded so binary
//! payloads survive the JSON tool protocol.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::http;
use crate::tools::{Tool, ToolOutcome};

/// Response bodies larger than this are truncated before being handed to
/// the model.
const MAX_BODY_CHARS: usize = 100_000;

#[derive(Debug, Deserialize)]
struct UrlRequestArgs {
    url: String,
}

/// Fetches a URL and returns its body, negotiated by content type.
pub struct UrlRequestTool;

impl UrlRequestTool {
    /// Creates the fetch tool.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn fetch(url: &str) -> ToolOutcome {
        let client = http::shared_client().await;
        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return ToolOutcome::error(format!("request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::error(format!("HTTP {status} from {url}"));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        debug!(url, %status, content_type, "url fetched");

        if content_type.contains("application/json") {
            return match response.json::<Value>().await {
                Ok(body) => ToolOutcome::ok(json!({
                    "url": url,
                    "status": status.as_u16(),
                    "content_type": content_type,
                    "body": body,
                })),
                Err(e) => ToolOutcome::error(format!("invalid JSON body: {e}")),
            };
        }

        if content_type.starts_with("text/")
            || content_type.contains("xml")
            || content_type.contains("javascript")
        {
            return match response.text().await {
                Ok(body) => ToolOutcome::ok(json!({
                    "url": url,
                    "status": status.as_u16(),
                    "content_type": content_type,
                    "body": truncate(&body),
                })),
                Err(e) => ToolOutcome::error(format!("failed to read body: {e}")),
            };
        }

        match response.bytes().await {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => ToolOutcome::ok(json!({
                    "url": url,
                    "status": status.as_u16(),
                    "content_type": content_type,
                    "body": truncate(text),
                })),
                Err(_) => ToolOutcome::ok(json!({
                    "url": url,
                    "status": status.as_u16(),
                    "content_type": content_type,
                    "body_base64": BASE64.encode(&bytes),
                    "bytes": bytes.len(),
                })),
            },
            Err(e) => ToolOutcome::error(format!("failed to read body: {e}")),
        }
    }
}

impl Default for UrlRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        body.chars().take(MAX_BODY_CHARS).collect()
    }
}

#[async_trait]
impl Tool for UrlRequestTool {
    fn name(&self) -> &'static str {
        "url_request"
    }

    fn description(&self) -> &'static str {
        "Fetch a URL over HTTP GET. Returns JSON bodies as structured data, \
         textual bodies as text, and binary bodies base64-encoded."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch."
                }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, arguments: Value) -> ToolOutcome {
        let args: UrlRequestArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::error(format!("invalid arguments: {e}")),
        };
        Self::fetch(&args.url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_arguments_fold_to_outcome() {
        let outcome = UrlRequestTool::new().invoke(json!({"not_url": 1})).await;
        assert!(!outcome.success);
        assert!(
            outcome
                .error
                .as_deref()
                .is_some_and(|e| e.contains("invalid arguments"))
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_folds_to_outcome() {
        let outcome = UrlRequestTool::new()
            .invoke(json!({"url": "http://127.0.0.1:1/nothing"}))
            .await;
        assert!(!outcome.success);
        assert!(
            outcome
                .error
                .as_deref()
                .is_some_and(|e| e.contains("request failed"))
        );
    }

    #[test]
    fn test_truncate_preserves_short_bodies() {
        assert_eq!(truncate("short"), "short");
    }
}
