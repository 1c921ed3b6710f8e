/*!
 * Sampling Gate
 * Time-window sampling of capture requests
 *
 * Time since gate creation is split into repeating periods of
 * `active + idle` milliseconds. Requests are accepted during the first
 * `active` milliseconds of each period (inclusive), rejected otherwise.
 */

use std::time::{Duration, Instant};

/// Sampling decision result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    Accept,
    Reject,
}

/// Repeating active/idle window predicate
#[derive(Debug, Clone)]
pub struct SamplingGate {
    active_ms: u128,
    period_ms: u128,
    start: Instant,
}

impl SamplingGate {
    /// Gate whose first period starts now
    pub fn new(active: Duration, idle: Duration) -> Self {
        Self::starting_at(active, idle, Instant::now())
    }

    pub fn starting_at(active: Duration, idle: Duration, start: Instant) -> Self {
        let active_ms = active.as_millis();
        Self {
            active_ms,
            period_ms: active_ms + idle.as_millis(),
            start,
        }
    }

    /// Gate that accepts everything
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.period_ms != 0
    }

    /// Decide for the current instant
    #[inline]
    pub fn should_capture(&self) -> bool {
        self.should_capture_now(Instant::now())
    }

    pub fn should_capture_now(&self, now: Instant) -> bool {
        self.should_capture_at(now.saturating_duration_since(self.start))
    }

    /// Decide for a given time since gate creation
    pub fn should_capture_at(&self, elapsed: Duration) -> bool {
        self.decide(elapsed) == SampleDecision::Accept
    }

    pub fn decide(&self, elapsed: Duration) -> SampleDecision {
        if !self.is_enabled() || elapsed.as_millis() % self.period_ms <= self.active_ms {
            SampleDecision::Accept
        } else {
            SampleDecision::Reject
        }
    }
}

impl Default for SamplingGate {
    fn default() -> Self {
        Self::disabled()
    }
}
