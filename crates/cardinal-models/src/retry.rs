use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Retry policy with randomized exponential backoff.
///
/// After the `n`th failed attempt the policy sleeps for a duration drawn
/// uniformly from `[min_delay, clamp(multiplier * 2^(n-1), min_delay, max_delay)]`.
/// The final error is returned as-is once `max_attempts` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::completion()
    }
}

impl RetryPolicy {
    /// Policy wrapped around every chat-completion request: 5 attempts,
    /// 1s to 60s waits.
    pub fn completion() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Short policy used by the HTTP transport for connection-level retries.
    pub fn transport(max_retries: usize) -> Self {
        Self {
            max_attempts: max_retries + 1,
            multiplier: Duration::from_millis(500),
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }

    /// A policy that never waits, for tests and callers that pace themselves.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            multiplier: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: Duration) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Upper bound of the wait that follows failed attempt `attempt` (1-based).
    pub fn delay_ceiling(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let grown = self.multiplier.saturating_mul(2u32.saturating_pow(exp));
        grown.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }

    /// Randomized wait that follows failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let low = self.min_delay.as_secs_f64();
        let high = self.delay_ceiling(attempt).as_secs_f64();
        if high <= low {
            return self.min_delay;
        }
        let secs = rand::thread_rng().gen_range(low..=high);
        Duration::from_secs_f64(secs)
    }

    /// Run `op`, retrying on every error.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(op, |_| true).await
    }

    /// Run `op`, retrying only errors for which `retryable` returns true.
    /// Each attempt calls `op` again, so no state carries over between attempts.
    pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt == max_attempts {
                        tracing::error!(attempts = attempt, error = %e, "retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
