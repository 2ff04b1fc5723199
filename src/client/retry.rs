//! Bounded retry loop shared by the HTTP adapter (transient failures) and the
//! throttle guard (rate limiting). Each caller owns its own policy and predicate.

use crate::error::RemoteError;
use crate::types::RetryPolicy;
use std::future::Future;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy's
/// attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn retry_with_policy<T, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    retryable: P,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
    P: Fn(&RemoteError) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !retryable(&err) {
            return Err(err);
        }
        if attempt >= max_attempts {
            warn!(label, attempts = attempt, error = %err, "Retry budget exhausted");
            return Err(err.with_attempts(attempt));
        }

        let delay = policy.delay_after(attempt);
        warn!(
            label,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after failure"
        );
        sleep(delay).await;
    }
}
