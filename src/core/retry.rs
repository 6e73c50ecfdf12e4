//! Bounded retry of fallible operations.
//!
//! The attempt counter lives inside each call, so unrelated operations never
//! share retry state.

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first (0 = no retries).
    pub max_retries: u32,

    /// Pause before each retry.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::once()
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_retries: 0, delay: Duration::ZERO }
    }

    /// Retry exactly once after a short pause. Used for archive downloads.
    pub fn once() -> Self {
        Self { max_retries: 1, delay: Duration::from_millis(500) }
    }

    /// Same policy without the pause.
    pub fn immediate(self) -> Self {
        Self { delay: Duration::ZERO, ..self }
    }

    /// Total attempts allowed, counting the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry a synchronous operation while `should_retry` accepts its error.
///
/// `on_retry` is called with the failed attempt number and its error before
/// each new attempt.
pub fn retry_if<T, E, F, P, L>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
    mut on_retry: L,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
    L: FnMut(u32, &E),
{
    let max_attempts = config.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation(attempts);

        match result {
            Err(ref e) if attempts < max_attempts && should_retry(e) => {
                on_retry(attempts, e);
                if !config.delay.is_zero() {
                    std::thread::sleep(config.delay);
                }
            }
            result => return RetryResult { result, attempts },
        }
    }
}
