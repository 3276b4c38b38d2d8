//! Shared HTTP client.
//!
//! One lazily-built `reqwest` client serves both the fetch tool and the
//! document downloader, so connection pools and TLS sessions are reused
//! across the whole process.

use std::time::Duration;

use tokio::sync::OnceCell;

static CLIENT: OnceCell<reqwest::Client> = OnceCell::const_new();

const USER_AGENT: &str = concat!("docquest/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The process-wide HTTP client, built on first use.
pub async fn shared_client() -> &'static reqwest::Client {
    CLIENT
        .get_or_init(|| async {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default()
        })
        .await
}
