// src/poll.rs

//! Convergence polling.
//!
//! [`wait_until`] repeatedly awaits a check until it reports the target
//! condition or the [`RetryPolicy`] runs out of attempts. The wait is
//! strictly sequential: the caller's task is occupied for at most
//! `max_attempts` checks plus the sleeps between them. There is no
//! cancellation hook.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::{BenchError, Result};
use crate::types::BackoffKind;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// How the delay between two attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Exponential { factor: u32, max_interval: Duration },
}

/// Explicit retry policy for poll loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff: Backoff::None,
        }
    }

    pub fn from_parts(
        max_attempts: u32,
        interval: Duration,
        kind: BackoffKind,
        factor: u32,
        max_interval: Duration,
    ) -> Self {
        let backoff = match kind {
            BackoffKind::None => Backoff::None,
            BackoffKind::Exponential => Backoff::Exponential {
                factor,
                max_interval,
            },
        };
        Self {
            max_attempts,
            interval,
            backoff,
        }
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exp = attempt.saturating_sub(1);
                let mult = factor.checked_pow(exp).unwrap_or(u32::MAX);
                self.interval
                    .checked_mul(mult)
                    .unwrap_or(max_interval)
                    .min(max_interval)
            }
        }
    }

    /// Upper bound of the total time spent sleeping in one poll loop.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }
}

/// Result of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The check held on attempt `attempts`.
    Converged { attempts: u32 },
    /// The check never held; `attempts` equals the policy's budget.
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            PollOutcome::Converged { attempts } | PollOutcome::TimedOut { attempts } => attempts,
        }
    }

    /// Turn a timeout into `BenchError::ConvergenceTimeout` for callers that
    /// treat it as fatal.
    pub fn into_result(self, target: &str) -> Result<u32> {
        match self {
            PollOutcome::Converged { attempts } => Ok(attempts),
            PollOutcome::TimedOut { attempts } => Err(BenchError::ConvergenceTimeout {
                target: target.to_string(),
                attempts,
            }),
        }
    }
}

/// Await `check` until it returns `Ok(true)` or the attempt budget is spent.
///
/// - Returns `Converged { attempts: k }` after exactly `k` invocations when
///   the k-th invocation holds.
/// - Returns `TimedOut { attempts: max_attempts }` after exactly
///   `max_attempts` invocations otherwise. No sleep follows the last attempt.
/// - An `Err` from `check` aborts the loop and is returned as is.
pub async fn wait_until<F, Fut>(policy: &RetryPolicy, target: &str, mut check: F) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=policy.max_attempts {
        let reached = check().await?;
        debug!(
            target_condition = target,
            attempt,
            max_attempts = policy.max_attempts,
            reached,
            "poll attempt"
        );
        if reached {
            return Ok(PollOutcome::Converged { attempts: attempt });
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Ok(PollOutcome::TimedOut {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use proptest::prelude::*;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    fn poll_with_success_on(k: Option<u32>, budget: u32) -> (PollOutcome, u32) {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::fixed(budget, Duration::ZERO);
        let outcome = rt()
            .block_on(wait_until(&policy, "test", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Ok(Some(n) == k) }
            }))
            .unwrap();
        (outcome, calls.get())
    }

    #[test]
    fn defaults_match_thirty_second_budget() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 60);
        assert_eq!(p.interval, Duration::from_millis(500));
        assert_eq!(p.worst_case_wait(), Duration::from_millis(500 * 59));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let p = RetryPolicy {
            max_attempts: 10,
            interval: Duration::from_millis(100),
            backoff: Backoff::Exponential {
                factor: 2,
                max_interval: Duration::from_millis(500),
            },
        };
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(400));
        assert_eq!(p.delay_after(4), Duration::from_millis(500));
        assert_eq!(p.delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn check_error_aborts_the_loop() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        let res = rt().block_on(wait_until(&policy, "test", || {
            calls.set(calls.get() + 1);
            async {
                Err::<bool, _>(BenchError::Execution {
                    action: "ns-show".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            }
        }));
        assert!(matches!(res, Err(BenchError::Execution { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn timed_out_converts_to_error() {
        let err = PollOutcome::TimedOut { attempts: 3 }
            .into_result("instance ready")
            .unwrap_err();
        assert!(matches!(err, BenchError::ConvergenceTimeout { attempts: 3, .. }));
    }

    proptest! {
        #[test]
        fn converges_after_exactly_k_calls(budget in 1u32..20, k in 1u32..20) {
            prop_assume!(k <= budget);
            let (outcome, calls) = poll_with_success_on(Some(k), budget);
            prop_assert_eq!(outcome, PollOutcome::Converged { attempts: k });
            prop_assert_eq!(calls, k);
        }

        #[test]
        fn times_out_after_exactly_budget_calls(budget in 1u32..20, late in 0u32..5) {
            // Success would only come after the budget is spent.
            let (outcome, calls) = poll_with_success_on(Some(budget + 1 + late), budget);
            prop_assert_eq!(outcome, PollOutcome::TimedOut { attempts: budget });
            prop_assert_eq!(calls, budget);
        }
    }
}
