//! Bounded retry with exponential backoff around remote calls.
//!
//! Every call to a remote collaborator goes through [`RetryPolicy::run`].
//! Failures the collaborator classifies as transient are retried with a
//! growing wait; anything else propagates immediately.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Classification capability of a remote-call error.
///
/// Implemented by collaborator error types so the policy can tell a flaky
/// network hiccup from a protocol or auth failure.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Outcome of a retried operation that never succeeded.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The inner call failed with a non-transient error; no retry happened.
    Fatal(E),
    /// Every attempt failed with a transient error.
    Exhausted { attempts: u32, last: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(e) => write!(f, "fatal error: {e}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "retries exhausted after {attempts} attempts: {last}")
            }
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for RetryError<E> {}

/// Bounded exponential backoff parameters.
///
/// `max_retries` is the total number of attempts; the wait before attempt
/// `n + 1` is `initial_wait * backoff_multiplier^(n - 1)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_wait_secs: f64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_wait_secs: 5.0,
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails non-transiently, or the attempt
    /// budget runs out.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Transient + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut wait = Duration::from_secs_f64(self.initial_wait_secs.max(0.0));
        let attempts = self.max_retries.max(1);

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryError::Fatal(e)),
                Err(e) => {
                    if attempt == attempts {
                        return Err(RetryError::Exhausted { attempts, last: e });
                    }
                    warn!(
                        attempt,
                        wait_secs = wait.as_secs_f64(),
                        error = %e,
                        "transient failure, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.mul_f64(self.backoff_multiplier.max(0.0));
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }
}
