//! Bounded retry loop driven by [`BackoffPolicy`]
//!
//! Each attempt reports an [`Attempt`] outcome; the loop only decides whether
//! to sleep and go again. Sleeping goes through [`Sleeper`] so tests can
//! record waits instead of taking them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::backoff::{BackoffPolicy, parse_retry_after};
use crate::error::{Condition, FetchError};
use crate::http::{HttpResponse, TransportFailure};

/// Longest slice of an error body kept in [`FetchError::Rejected`]
const ERROR_BODY_LIMIT: usize = 200;

/// Blocking wait between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// Retryable condition, with the server's wait hint if it gave one
    Retry {
        condition: Condition,
        retry_after: Option<Duration>,
    },
    /// Terminal, no further attempts
    Fail(FetchError),
}

impl Attempt<String> {
    /// Classify an HTTP response. `Retry-After` is only honored on 429.
    pub fn from_response(response: HttpResponse, now: DateTime<Utc>) -> Self {
        if response.is_success() {
            return Self::Done(response.body);
        }
        let condition = Condition::Status(response.status);
        if condition.is_retryable() {
            let retry_after = if response.status == 429 {
                response
                    .retry_after
                    .as_deref()
                    .and_then(|v| parse_retry_after(v, now))
            } else {
                None
            };
            return Self::Retry {
                condition,
                retry_after,
            };
        }
        Self::Fail(FetchError::Rejected {
            status: response.status,
            message: truncate_body(&response.body),
        })
    }

    /// Classify a transport result.
    pub fn from_transport(
        result: Result<HttpResponse, TransportFailure>,
        now: DateTime<Utc>,
    ) -> Self {
        match result {
            Ok(response) => Self::from_response(response, now),
            Err(TransportFailure::Network(e)) => Self::Retry {
                condition: Condition::Transport(e),
                retry_after: None,
            },
            Err(TransportFailure::Invalid(e)) => Self::Fail(e),
        }
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Run `attempt_fn` until it succeeds, fails terminally, or `max_attempts`
/// is reached.
///
/// `attempt_fn` receives the 1-based attempt number. The counter keeps
/// increasing whether the wait came from `Retry-After` or from the
/// exponential schedule. No sleep happens after the final attempt.
pub fn retry_with_backoff<T, R: Rng + ?Sized>(
    label: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    rng: &mut R,
    mut attempt_fn: impl FnMut(u32) -> Attempt<T>,
) -> Result<T, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt) {
            Attempt::Done(v) => return Ok(v),
            Attempt::Fail(e) => {
                log::debug!("{label}: failed permanently: {e}");
                return Err(e);
            }
            Attempt::Retry { condition, .. } if attempt >= max_attempts => {
                log::warn!("{label}: attempt {attempt}/{max_attempts} failed: {condition}, giving up");
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: condition,
                });
            }
            Attempt::Retry {
                condition,
                retry_after,
            } => {
                let wait = policy.backoff.delay(attempt, retry_after, rng);
                log::warn!(
                    "{label}: attempt {attempt}/{max_attempts} failed: {condition}, retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                sleeper.sleep(wait);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::Sleeper;

    /// Records requested waits without sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn waits(&self) -> Vec<Duration> {
            self.waits.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }
}
