//! Retry with exponential backoff for upstream service calls
//!
//! One policy object is shared by the question/evaluation client and the
//! speech clients: bounded attempts, exponential backoff with jitter, and a
//! `Retry-After` override for rate-limited responses.

use std::time::Duration;

use rand::Rng;

/// Retry policy for upstream HTTP calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(700),
            max_delay: Duration::from_secs(20),
        }
    }
}

/// Whether an HTTP status indicates a recoverable failure worth retrying
///
/// Rate limits (429) and server errors (5xx) recover on their own; client
/// errors do not.
#[must_use]
pub const fn is_recoverable(status: u16) -> bool {
    status == 429 || (status >= 500 && status < 600)
}

/// Parse an HTTP `Retry-After` header value into a duration
///
/// Accepts the delta-seconds form (possibly fractional) and the HTTP-date
/// form. Returns `None` when the value is absent or unparseable.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<f64>() {
        if secs >= 0.0 && secs.is_finite() {
            return Some(Duration::from_secs_f64(secs).max(Duration::from_millis(250)));
        }
        return None;
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    let delta = delta.to_std().unwrap_or_default();
    Some(delta.max(Duration::from_millis(250)))
}

/// Compute the delay before the next retry attempt
///
/// A server-provided `retry_after` wins (capped at `max_delay`); otherwise
/// exponential backoff `base_delay * 2^attempt` plus 0-25% jitter.
#[must_use]
pub fn delay_for_attempt(
    policy: &RetryPolicy,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(ra) = retry_after {
        return ra.min(policy.max_delay);
    }

    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(policy.max_delay);

    let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.25));
    (base + jitter).min(policy.max_delay)
}
