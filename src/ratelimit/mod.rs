//! Rate Limit Module
//!
//! Per-client token buckets keyed by the resolved client address.

mod bucket;
mod client;
mod limiter;

pub use bucket::RateBucket;
pub use client::{client_key, FORWARDED_FOR_HEADER, TRUSTED_CLIENT_HEADER, UNKNOWN_CLIENT};
pub use limiter::{RateLimitSettings, RateLimiter};
