//! Eventual-consistency polling for index builds and clears.
//!
//! Remote vector backends acknowledge writes before they are searchable and
//! deletes before counts drop. These helpers poll with a capped exponential
//! backoff until the index reflects the change, then give up with a warning
//! after a bounded number of attempts so the pipeline degrades rather than
//! hangs.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::VectorStore;

/// Backoff schedule for consistency polling.
#[derive(Debug, Clone)]
pub struct ConsistencyPolicy {
    /// Maximum probe attempts before giving up.
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Ceiling on the per-retry delay.
    pub max_delay: Duration,
}

impl ConsistencyPolicy {
    /// Policy used after insertions (15 attempts, 1s base, 8s cap).
    #[must_use]
    pub const fn for_insert() -> Self {
        Self {
            max_attempts: 15,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }

    /// Policy used after clears (8 attempts, 1s base, 8s cap).
    #[must_use]
    pub const fn for_clear() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }

    /// Delay to sleep after a failed `attempt` (zero-based). Exponential in
    /// the attempt number, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.min(4)).unwrap_or(4);
        let scaled = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        scaled.min(self.max_delay)
    }
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self::for_insert()
    }
}

/// Result of a polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the index reflected the change before the attempt ceiling.
    pub confirmed: bool,
    /// Number of probe attempts made.
    pub attempts: usize,
}

/// Poll until a probe search against `document_id` returns at least one
/// result. Returns unconfirmed (never errors) once the ceiling is reached,
/// so callers proceed best-effort.
pub async fn await_searchable(
    store: &dyn VectorStore,
    document_id: &str,
    probe_query: &str,
    policy: &ConsistencyPolicy,
) -> Result<PollOutcome, StoreError> {
    for attempt in 0..policy.max_attempts {
        let hits = store
            .search_with_score(probe_query, 1, Some(document_id))
            .await?;
        if !hits.is_empty() {
            debug!(document_id, attempts = attempt + 1, "index searchable");
            return Ok(PollOutcome {
                confirmed: true,
                attempts: attempt + 1,
            });
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
    }
    warn!(
        document_id,
        attempts = policy.max_attempts,
        "index not yet searchable, proceeding anyway"
    );
    Ok(PollOutcome {
        confirmed: false,
        attempts: policy.max_attempts,
    })
}

/// Poll until `count()` reaches zero after a clear. Same give-up semantics
/// as [`await_searchable`].
pub async fn await_cleared(
    store: &dyn VectorStore,
    policy: &ConsistencyPolicy,
) -> Result<PollOutcome, StoreError> {
    for attempt in 0..policy.max_attempts {
        let remaining = store.count().await?;
        if remaining == 0 {
            debug!(attempts = attempt + 1, "index clear confirmed");
            return Ok(PollOutcome {
                confirmed: true,
                attempts: attempt + 1,
            });
        }
        debug!(remaining, attempt, "index not yet clear");
        tokio::time::sleep(policy.delay_for(attempt)).await;
    }
    warn!(
        attempts = policy.max_attempts,
        "index clear not confirmed, proceeding anyway"
    );
    Ok(PollOutcome {
        confirmed: false,
        attempts: policy.max_attempts,
    })
}
