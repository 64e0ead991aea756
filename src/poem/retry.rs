//! Bounded retries for transient generation failures.
//!
//! [`RetryingGenerator`] wraps any [`PoemGenerator`].  Each attempt runs
//! under its own timeout; transient failures are retried after a growing
//! delay until [`RetryPolicy::max_attempts`] is reached, permanent failures
//! are returned at once.  The worst-case latency of one press is therefore
//! `max_attempts × attempt_timeout` plus the backoff delays.

use std::time::Duration;

use async_trait::async_trait;

use crate::camera::CapturedImage;
use crate::config::GeneratorConfig;
use crate::poem::{GenerationError, Poem, PoemGenerator};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.  Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Delay growth factor per further attempt.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Upper bound on any single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.backoff_multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            attempt_timeout: config.timeout(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    ///
    /// ```
    /// use std::time::Duration;
    /// use poetry_printer::poem::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     initial_backoff: Duration::from_millis(500),
    ///     multiplier: 2.0,
    ///     max_backoff: Duration::from_millis(1500),
    ///     ..RetryPolicy::default()
    /// };
    /// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
    /// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(1500));
    /// ```
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

// ---------------------------------------------------------------------------
// RetryingGenerator
// ---------------------------------------------------------------------------

/// Adds the [`RetryPolicy`] to any generator.
pub struct RetryingGenerator<G: PoemGenerator> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: PoemGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<G: PoemGenerator> PoemGenerator for RetryingGenerator<G> {
    async fn generate(&self, image: &CapturedImage) -> Result<Poem, GenerationError> {
        let max = self.policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result =
                match tokio::time::timeout(self.policy.attempt_timeout, self.inner.generate(image))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::Timeout),
                };

            match result {
                Ok(poem) => {
                    if attempt > 1 {
                        log::info!("generator: succeeded on attempt {attempt}/{max}");
                    }
                    return Ok(poem);
                }
                Err(e) if e.is_transient() && attempt < max => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    log::warn!("generator: attempt {attempt}/{max} failed ({e}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(GenerationError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    log::warn!("generator: attempt {attempt}/{max} failed permanently: {e}");
                    return Err(e);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
