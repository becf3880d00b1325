use crate::Error;
use std::time::Duration;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry policy: bounded attempts, exponential backoff, no jitter.
///
/// Important constraints:
/// - The delay after failed attempt `k` (1-based) is `base * 2^(k-1)`.
/// - The last attempt never sleeps; its error goes straight to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PolicyEngine {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retry_on_permission_denied: bool,
}

impl PolicyEngine {
    pub fn new(max_attempts: u32, base_delay: Duration, retry_on_permission_denied: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retry_on_permission_denied,
        }
    }

    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decide what to do after `attempt` (1-based) failed with `err`.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        let retryable = match err {
            // 403 follows the configured switch; on by default.
            Error::Permission { .. } => self.retry_on_permission_denied,
            other => other.is_retryable(),
        };

        if retryable && attempt < self.max_attempts {
            Decision::Retry {
                delay: self.backoff_delay(attempt),
            }
        } else {
            Decision::Fail
        }
    }
}
