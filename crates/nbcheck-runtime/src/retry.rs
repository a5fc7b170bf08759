//! Bounded retry loop shared by readiness polling and HTTP checks.

use std::fmt::Display;

use nbcheck_common::types::RetryPolicy;

/// Final outcome of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T, E> {
    /// The first success, or the error of the last attempt.
    pub outcome: Result<T, E>,
    /// Number of attempts made, between 1 and `max_attempts`.
    pub attempts: u32,
}

/// Calls `attempt` until it succeeds or the policy's budget is spent.
///
/// The closure receives the 1-based attempt number. `policy.delay` is slept
/// between attempts, never after the last one.
pub fn retry_until<T, E, F>(policy: &RetryPolicy, mut attempt: F) -> Retried<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 0;
    loop {
        n += 1;
        match attempt(n) {
            Ok(value) => {
                return Retried {
                    outcome: Ok(value),
                    attempts: n,
                };
            }
            Err(e) if n >= max_attempts => {
                tracing::debug!(attempt = n, error = %e, "retry budget exhausted");
                return Retried {
                    outcome: Err(e),
                    attempts: n,
                };
            }
            Err(e) => {
                tracing::debug!(attempt = n, max_attempts, error = %e, "attempt failed, retrying");
                std::thread::sleep(policy.delay);
            }
        }
    }
}
