//! Token Bucket Module
//!
//! Continuous token bucket: tokens flow back in proportion to elapsed time
//! and each allowed request spends exactly one.

use chrono::{DateTime, Duration, Utc};

// == Rate Bucket ==
/// Request budget of a single client.
///
/// Invariant: `0 <= tokens <= capacity`.
#[derive(Debug, Clone)]
pub struct RateBucket {
    tokens: f64,
    capacity: u32,
    /// Tokens regained per second
    refill_rate: f64,
    last_refill_at: DateTime<Utc>,
}

impl RateBucket {
    /// A bucket holding its full capacity.
    pub fn full(capacity: u32, refill_rate: f64, now: DateTime<Utc>) -> Self {
        Self {
            tokens: capacity as f64,
            capacity,
            refill_rate,
            last_refill_at: now,
        }
    }

    /// Credits tokens for the time elapsed since the last refill, capped at
    /// capacity. A clock that moved backwards credits nothing, and neither
    /// does a refill rate that is negative or not a number.
    pub fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed = now - self.last_refill_at;
        if elapsed <= Duration::zero() {
            return;
        }
        self.last_refill_at = now;

        let seconds = elapsed
            .num_microseconds()
            .map_or(f64::MAX, |micros| micros as f64 / 1_000_000.0);
        let credit = seconds * self.refill_rate;
        if credit.is_nan() || credit <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + credit).clamp(0.0, self.capacity as f64);
    }

    /// Refills, then spends one token if a whole one is available.
    pub fn try_consume(&mut self, now: DateTime<Utc>) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Time since the bucket was last touched.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_refill_at
    }
}
