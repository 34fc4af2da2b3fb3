//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::session::CookiePolicy;

/// Largest accepted duration setting in seconds (ten years). Larger values
/// would overflow timestamp arithmetic.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Age in seconds after which a cached entity set is discarded
    pub entity_cache_ttl: u64,
    /// Lifetime in seconds of a resolved-user cache entry
    pub session_cache_ttl: u64,
    /// Inactivity in seconds after which a session row is dead
    pub session_max_idle: u64,
    /// Interval in seconds between session sweeps
    pub session_sweep_interval: u64,
    /// Re-check the session row even when the resolved-user cache hits
    pub session_revalidate: bool,
    /// Delete the session row synchronously on logout
    pub session_revoke_deletes_row: bool,
    /// Token bucket capacity (burst size)
    pub rate_limit_capacity: u32,
    /// Tokens regained per second
    pub rate_limit_refill_per_sec: f64,
    /// Inactivity in seconds after which a bucket is evicted
    pub rate_limit_idle: u64,
    /// Interval in seconds between bucket evictions
    pub rate_limit_evict_interval: u64,
    /// Upper bound in milliseconds on any persistent store call
    pub store_timeout_ms: u64,
    /// Session cookie attributes
    pub cookie: CookiePolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `WEB_PORT` - HTTP server port (default: 3000)
    /// - `ENTITY_CACHE_TTL_SECS` - Entity set TTL (default: 900)
    /// - `SESSION_CACHE_TTL_SECS` - Resolved-user cache TTL (default: 7200)
    /// - `SESSION_MAX_IDLE_SECS` - Session inactivity lifetime (default: 2592000)
    /// - `SESSION_SWEEP_INTERVAL_SECS` - Sweep frequency (default: 3600)
    /// - `SESSION_REVALIDATE` - Re-check rows on cache hit (default: true)
    /// - `SESSION_REVOKE_DELETES_ROW` - Delete rows on logout (default: true)
    /// - `RATE_LIMIT_CAPACITY` - Bucket burst size (default: 30)
    /// - `RATE_LIMIT_REFILL_PER_SEC` - Sustained rate (default: 10)
    /// - `RATE_LIMIT_IDLE_SECS` - Bucket idle window (default: 900)
    /// - `RATE_LIMIT_EVICT_INTERVAL_SECS` - Eviction frequency (default: 1800)
    /// - `STORE_TIMEOUT_MS` - Store call timeout (default: 5000)
    /// - `SESSION_COOKIE_NAME` - Cookie name (default: session_id)
    /// - `ENV` - `production` forces secure cookies
    /// - `COOKIE_CROSS_ORIGIN` - Serve cookies with `SameSite=None` (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secure = env::var("ENV").map(|v| v == "production").unwrap_or(false);

        Self {
            server_port: env_or("WEB_PORT", defaults.server_port),
            entity_cache_ttl: env_secs("ENTITY_CACHE_TTL_SECS", defaults.entity_cache_ttl),
            session_cache_ttl: env_secs("SESSION_CACHE_TTL_SECS", defaults.session_cache_ttl),
            session_max_idle: env_secs("SESSION_MAX_IDLE_SECS", defaults.session_max_idle),
            session_sweep_interval: env_secs(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval,
            ),
            session_revalidate: env_or("SESSION_REVALIDATE", defaults.session_revalidate),
            session_revoke_deletes_row: env_or(
                "SESSION_REVOKE_DELETES_ROW",
                defaults.session_revoke_deletes_row,
            ),
            rate_limit_capacity: env_checked(
                "RATE_LIMIT_CAPACITY",
                defaults.rate_limit_capacity,
                |capacity| *capacity >= 1,
            ),
            rate_limit_refill_per_sec: env_checked(
                "RATE_LIMIT_REFILL_PER_SEC",
                defaults.rate_limit_refill_per_sec,
                |rate| rate.is_finite() && *rate > 0.0,
            ),
            rate_limit_idle: env_secs("RATE_LIMIT_IDLE_SECS", defaults.rate_limit_idle),
            rate_limit_evict_interval: env_secs(
                "RATE_LIMIT_EVICT_INTERVAL_SECS",
                defaults.rate_limit_evict_interval,
            ),
            store_timeout_ms: env_checked("STORE_TIMEOUT_MS", defaults.store_timeout_ms, |ms| {
                (1..=MAX_DURATION_SECS * 1000).contains(ms)
            }),
            cookie: CookiePolicy {
                name: env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie.name),
                secure,
                cross_origin: env_or("COOKIE_CROSS_ORIGIN", false),
                max_age: defaults.cookie.max_age,
            },
        }
    }

    /// Store call timeout as a `Duration`.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Parses an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`], but also falls back when the parsed value fails `valid`.
fn env_checked<T>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Clone + std::fmt::Debug,
{
    let value = env_or(key, default.clone());
    if valid(&value) {
        value
    } else {
        warn!(key, ?value, "Ignoring out-of-range setting, using default");
        default
    }
}

/// Duration setting in seconds, within `1..=MAX_DURATION_SECS`.
fn env_secs(key: &str, default: u64) -> u64 {
    env_checked(key, default, |secs| (1..=MAX_DURATION_SECS).contains(secs))
}

/// Converts a duration setting to a chrono `Duration`, capped at
/// [`MAX_DURATION_SECS`] so the conversion can never overflow.
pub fn bounded_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            entity_cache_ttl: crate::cache::DEFAULT_ENTITY_TTL_SECS,
            session_cache_ttl: 2 * 60 * 60,
            session_max_idle: 30 * 24 * 60 * 60,
            session_sweep_interval: 60 * 60,
            session_revalidate: true,
            session_revoke_deletes_row: true,
            rate_limit_capacity: 30,
            rate_limit_refill_per_sec: 10.0,
            rate_limit_idle: 15 * 60,
            rate_limit_evict_interval: 30 * 60,
            store_timeout_ms: 5000,
            cookie: CookiePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.entity_cache_ttl, 900);
        assert_eq!(config.session_cache_ttl, 7200);
        assert_eq!(config.session_max_idle, 2_592_000);
        assert_eq!(config.rate_limit_capacity, 30);
        assert_eq!(config.rate_limit_refill_per_sec, 10.0);
        assert_eq!(config.rate_limit_idle, 900);
        assert!(config.session_revalidate);
        assert!(config.session_revoke_deletes_row);
        assert_eq!(config.cookie.name, "session_id");
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("WEB_PORT");
        env::remove_var("ENTITY_CACHE_TTL_SECS");
        env::remove_var("RATE_LIMIT_CAPACITY");
        env::remove_var("ENV");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.entity_cache_ttl, 900);
        assert_eq!(config.rate_limit_capacity, 30);
        assert!(!config.cookie.secure);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_out_of_range_settings_fall_back() {
        env::set_var("RATE_LIMIT_REFILL_PER_SEC", "-10");
        env::set_var("RATE_LIMIT_CAPACITY", "0");
        env::set_var("SESSION_MAX_IDLE_SECS", u64::MAX.to_string());
        env::set_var("SESSION_SWEEP_INTERVAL_SECS", "0");
        env::set_var("STORE_TIMEOUT_MS", "0");

        let config = Config::from_env();
        assert_eq!(config.rate_limit_refill_per_sec, 10.0);
        assert_eq!(config.rate_limit_capacity, 30);
        assert_eq!(config.session_max_idle, 2_592_000);
        assert_eq!(config.session_sweep_interval, 3600);
        assert_eq!(config.store_timeout_ms, 5000);

        for rate in ["NaN", "inf", "0"] {
            env::set_var("RATE_LIMIT_REFILL_PER_SEC", rate);
            assert_eq!(Config::from_env().rate_limit_refill_per_sec, 10.0, "{}", rate);
        }

        env::set_var("RATE_LIMIT_REFILL_PER_SEC", "2.5");
        assert_eq!(Config::from_env().rate_limit_refill_per_sec, 2.5);

        for key in [
            "RATE_LIMIT_REFILL_PER_SEC",
            "RATE_LIMIT_CAPACITY",
            "SESSION_MAX_IDLE_SECS",
            "SESSION_SWEEP_INTERVAL_SECS",
            "STORE_TIMEOUT_MS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_bounded_secs_never_overflows() {
        assert_eq!(bounded_secs(90), chrono::Duration::seconds(90));
        assert_eq!(
            bounded_secs(u64::MAX),
            chrono::Duration::seconds(MAX_DURATION_SECS as i64)
        );
        // Far-future arithmetic stays in range
        let _ = chrono::Utc::now() + bounded_secs(u64::MAX);
    }

    #[test]
    fn test_env_or_malformed_falls_back() {
        env::set_var("BRAND_SERVICE_TEST_BAD_NUMBER", "not-a-number");
        assert_eq!(env_or("BRAND_SERVICE_TEST_BAD_NUMBER", 7u32), 7);
        env::remove_var("BRAND_SERVICE_TEST_BAD_NUMBER");
    }
}
