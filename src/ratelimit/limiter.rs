//! Rate Limiter Module
//!
//! Per-client token buckets in a sharded concurrent map. Refill and consume
//! happen under the shard lock of a single entry, so concurrent requests from
//! one client can never spend the same token twice.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::clock::SharedClock;
use crate::config::{bounded_secs, Config};
use crate::error::{CoreError, Result};

use super::bucket::RateBucket;

// == Settings ==
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitSettings {
    /// Burst size, also the token count of a new bucket
    pub capacity: u32,
    /// Tokens regained per second
    pub refill_per_sec: f64,
    /// Buckets untouched for this long are evicted
    pub idle: Duration,
}

impl From<&Config> for RateLimitSettings {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.rate_limit_capacity,
            refill_per_sec: config.rate_limit_refill_per_sec,
            idle: bounded_secs(config.rate_limit_idle),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

// == Rate Limiter ==
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, RateBucket>,
    clock: SharedClock,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(clock: SharedClock, settings: RateLimitSettings) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
            settings,
        }
    }

    /// Spends one token from `client`'s bucket, creating a full bucket for a
    /// client seen for the first time.
    pub fn allow(&self, client: &str) -> bool {
        let now = self.clock.now();

        // Fast path avoids allocating the key for known clients
        if let Some(mut bucket) = self.buckets.get_mut(client) {
            return bucket.try_consume(now);
        }

        self.buckets
            .entry(client.to_string())
            .or_insert_with(|| self.new_bucket(now))
            .try_consume(now)
    }

    /// Like [`allow`](Self::allow) but as an error for the request path.
    pub fn check(&self, client: &str) -> Result<()> {
        if self.allow(client) {
            Ok(())
        } else {
            debug!(client = %client, "rate limit exceeded");
            Err(CoreError::RateLimited(format!(
                "too many requests from {}",
                client
            )))
        }
    }

    /// Drops every bucket idle for at least the configured window.
    ///
    /// Returns the number of buckets removed.
    pub fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let idle = self.settings.idle;
        let before = self.buckets.len();

        self.buckets.retain(|_, bucket| bucket.idle_for(now) < idle);

        before.saturating_sub(self.buckets.len())
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    fn new_bucket(&self, now: DateTime<Utc>) -> RateBucket {
        RateBucket::full(self.settings.capacity, self.settings.refill_per_sec, now)
    }
}
