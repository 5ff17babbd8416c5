//! Bounded retry with exponential backoff around store calls.

use crate::graph_store::StoreResult;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{error, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Wait before the attempt following `attempt` (1-based): 1x, 2x, 4x, 8x base,
    /// never more than `MAX_BACKOFF`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .map_or(MAX_BACKOFF, |wait| wait.min(MAX_BACKOFF))
    }

    /// Run `op` until it succeeds or the attempt budget is spent; the last
    /// error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "⚠️  {} failed: {}. Retrying in {:?} (attempt {}/{})...",
                        what, e, wait, attempt, max_attempts
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("❌ {} failed after {} attempts: {}", what, max_attempts, e);
                    return Err(e);
                }
            }
        }
    }
}
