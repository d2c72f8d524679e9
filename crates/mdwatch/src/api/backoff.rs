//! Back-off policies applied after the completion endpoint rate-limits us.
//!
//! The poller asks its [`BackoffPolicy`] for one delay per rate-limited
//! cycle. Delays are bounded and never retried in a tight loop: the next
//! attempt only happens on the following poll.

use std::time::Duration;

/// Computes how long to pause after a rate-limited request.
pub trait BackoffPolicy: Send + Sync {
    /// `attempt` counts consecutive rate-limited cycles, starting at 0.
    /// `retry_after` is the server's hint, if it sent one.
    fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration;
}

/// Always wait the same amount. `FixedDelay(Duration::ZERO)` suits tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl BackoffPolicy for FixedDelay {
    fn delay(&self, _attempt: u32, _retry_after: Option<Duration>) -> Duration {
        self.0
    }
}

/// Wait until the next wall-clock boundary of `interval`.
///
/// With the default one-minute interval a rate limit at 12:00:45 resumes
/// at 12:01:00. A longer server hint takes precedence, up to `max`.
#[derive(Debug, Clone, Copy)]
pub struct AlignedToInterval {
    pub interval: Duration,
    /// Upper bound for any single pause, server hint included.
    pub max: Duration,
}

impl Default for AlignedToInterval {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max: Duration::from_secs(300),
        }
    }
}

impl AlignedToInterval {
    /// Delay from `now_ms` (milliseconds since the Unix epoch) to the next boundary.
    pub fn delay_from(&self, now_ms: u64, retry_after: Option<Duration>) -> Duration {
        let interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        if interval_ms == 0 {
            return retry_after.unwrap_or_default().min(self.max);
        }
        let aligned = Duration::from_millis(interval_ms - now_ms % interval_ms);
        retry_after
            .map_or(aligned, |hint| hint.max(aligned))
            .min(self.max)
    }
}

impl BackoffPolicy for AlignedToInterval {
    fn delay(&self, _attempt: u32, retry_after: Option<Duration>) -> Duration {
        let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        self.delay_from(now_ms, retry_after)
    }
}

/// Exponential growth per consecutive rate limit, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct CappedExponential {
    /// Delay for the first rate limit.
    pub initial: Duration,
    /// Upper bound for any single pause.
    pub max: Duration,
    /// Growth factor (typically 2.0).
    pub multiplier: f64,
}

impl Default for CappedExponential {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy for CappedExponential {
    fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max.as_secs_f64();
        let capped = if base.is_finite() { base.min(max) } else { max };
        let computed = Duration::from_secs_f64(capped);
        match retry_after {
            Some(hint) => hint.max(computed).min(self.max),
            None => computed,
        }
    }
}
