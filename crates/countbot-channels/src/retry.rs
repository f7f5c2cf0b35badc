//! Retry policies as an explicit state machine.
//!
//! ```text
//! attempt ──ok──▶ Done
//!    │
//!   err ──▶ RetryState::on_failure ──▶ Decision::Retry(wait) ──sleep──▶ attempt
//!                                  └─▶ Decision::GiveUp ──▶ Err(last error)
//! ```
//!
//! `Unbounded` never gives up. `Bounded` gives up after `max_retries`
//! extra attempts, or immediately on a non-throttling error when
//! `rate_limit_only` is set.

use countbot_core::config::RetryConfig;
use countbot_core::error::{CountBotError, Result};
use std::future::Future;
use std::time::Duration;

/// Default fixed backoff between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry every failure forever with a fixed wait.
    Unbounded { interval: Duration },
    /// Retry at most `max_retries` times with a fixed wait.
    Bounded {
        max_retries: u32,
        interval: Duration,
        rate_limit_only: bool,
    },
}

impl RetryPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self::Unbounded { interval }
    }

    pub fn bounded(max_retries: u32, interval: Duration) -> Self {
        Self::Bounded { max_retries, interval, rate_limit_only: false }
    }

    /// Bounded policy that only retries throttling errors.
    pub fn bounded_rate_limited(max_retries: u32, interval: Duration) -> Self {
        Self::Bounded { max_retries, interval, rate_limit_only: true }
    }

    /// Broadcast delivery: retry until it lands.
    pub fn broadcast(config: &RetryConfig) -> Self {
        Self::unbounded(config.interval())
    }

    /// Interactive delivery: the caller needs an answer.
    pub fn interactive(config: &RetryConfig) -> Self {
        Self::Bounded {
            max_retries: config.max_retries,
            interval: config.interval(),
            rate_limit_only: config.delivery_rate_limit_only,
        }
    }

    /// Metadata lookups for interactive commands and events.
    pub fn metadata(config: &RetryConfig) -> Self {
        Self::Bounded {
            max_retries: config.max_retries,
            interval: config.interval(),
            rate_limit_only: config.metadata_rate_limit_only,
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Self::Unbounded { interval } | Self::Bounded { interval, .. } => *interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(3, DEFAULT_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry(Duration),
    GiveUp,
}

/// Attempt bookkeeping for one logical operation.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self, error: &CountBotError) -> Decision {
        self.failures = self.failures.saturating_add(1);
        match self.policy {
            RetryPolicy::Unbounded { interval } => Decision::Retry(interval),
            RetryPolicy::Bounded { max_retries, interval, rate_limit_only } => {
                if rate_limit_only && !error.is_rate_limit() {
                    Decision::GiveUp
                } else if self.failures > max_retries {
                    Decision::GiveUp
                } else {
                    Decision::Retry(interval)
                }
            }
        }
    }
}

/// Run `op` under `policy`, sleeping the fixed interval between attempts.
/// `what` names the operation in logs.
pub async fn run_with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut state = RetryState::new(policy);
    loop {
        match op().await {
            Ok(value) => {
                if state.failures() > 0 {
                    tracing::info!("{what} succeeded after {} retries", state.failures());
                }
                return Ok(value);
            }
            Err(e) => match state.on_failure(&e) {
                Decision::Retry(wait) => {
                    tracing::warn!(
                        "{what} failed (attempt {}): {e}; retrying in {}s",
                        state.failures(),
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                }
                Decision::GiveUp => {
                    tracing::warn!("{what} failed after {} attempts: {e}", state.failures());
                    return Err(e);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_bounded_gives_up_after_max_retries() {
        let mut state = RetryState::new(RetryPolicy::bounded(2, WAIT));
        let err = CountBotError::transport("boom");
        assert_eq!(state.on_failure(&err), Decision::Retry(WAIT));
        assert_eq!(state.on_failure(&err), Decision::Retry(WAIT));
        assert_eq!(state.on_failure(&err), Decision::GiveUp);
        assert_eq!(state.failures(), 3);
    }

    #[test]
    fn test_rate_limit_only_fails_fast_on_other_errors() {
        let mut state = RetryState::new(RetryPolicy::bounded_rate_limited(3, WAIT));
        assert_eq!(
            state.on_failure(&CountBotError::transport("rate-overlimit")),
            Decision::Retry(WAIT)
        );
        assert_eq!(
            state.on_failure(&CountBotError::transport("item-not-found")),
            Decision::GiveUp
        );
    }

    #[test]
    fn test_unbounded_never_gives_up() {
        let mut state = RetryState::new(RetryPolicy::unbounded(WAIT));
        let err = CountBotError::store("locked");
        for _ in 0..1000 {
            assert_eq!(state.on_failure(&err), Decision::Retry(WAIT));
        }
    }

    #[test]
    fn test_policies_from_config() {
        let config = RetryConfig::default();
        assert_eq!(RetryPolicy::broadcast(&config), RetryPolicy::unbounded(WAIT));
        assert_eq!(RetryPolicy::interactive(&config), RetryPolicy::bounded(3, WAIT));
        assert_eq!(RetryPolicy::metadata(&config), RetryPolicy::bounded_rate_limited(3, WAIT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_retry_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = run_with_retry(RetryPolicy::bounded(1, WAIT), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CountBotError::transport("down")) }
        })
        .await;
        assert!(matches!(result, Err(CountBotError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_retry_zero_retries_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: Result<()> = run_with_retry(RetryPolicy::bounded(0, WAIT), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CountBotError::transport("down")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
