// src/ingest/retry.rs
//! Deadline + exponential-backoff wrapper for external calls. A timeout
//! cancels only the wrapped call; siblings keep running.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};

use super::types::Tier;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` under the tier's timeout, retrying up to the tier's budget with
/// `base_delay * 2^attempt` backoff between attempts.
pub async fn with_budget<T, F, Fut>(tier: Tier, base_delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = tier.retries() + 1;
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = base_delay * 2u32.pow(attempt - 1);
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(tier.timeout(), op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                tracing::debug!(error = ?e, attempt, "call failed");
                last_err = Some(e);
            }
            Err(_) => {
                tracing::debug!(attempt, timeout_ms = tier.timeout().as_millis() as u64, "call timed out");
                last_err = Some(anyhow!(
                    "timed out after {}ms",
                    tier.timeout().as_millis()
                ));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("no attempts made")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let out = with_budget(Tier::Fast, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(7)
        })
        .await
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let err = with_budget(Tier::Slow, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("boom"))
        })
        .await
        .unwrap_err();
        // Slow tier: 1 initial + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn internal_tier_never_retries() {
        let calls = AtomicU32::new(0);
        let _ = with_budget(Tier::Internal, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("down"))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failed_attempt() {
        let calls = AtomicU32::new(0);
        let res = with_budget(Tier::Fast, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, anyhow::Error>(())
        })
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(res.unwrap_err().to_string().contains("timed out"));
    }
}
