//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for plain acknowledgements (logout, delete)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human readable outcome
    pub message: String,
}

impl MessageResponse {
    /// Creates a new MessageResponse
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Users cache counters
    pub users: CacheStats,
    /// Images cache counters
    pub images: CacheStats,
    /// Hit rate across both entity caches
    pub hit_rate: f64,
    /// Resolved-user cache entries held by this process
    pub cached_sessions: usize,
    /// Live rate-limit buckets
    pub rate_buckets: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from per-component counters
    pub fn new(
        users: CacheStats,
        images: CacheStats,
        cached_sessions: usize,
        rate_buckets: usize,
    ) -> Self {
        let hit_rate = users.combined(&images).hit_rate();
        Self {
            users,
            images,
            hit_rate,
            cached_sessions,
            rate_buckets,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_serialize() {
        let resp = MessageResponse::new("Logged out successfully");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Logged out successfully"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let users = CacheStats {
            hits: 6,
            misses: 2,
            ..Default::default()
        };
        let images = CacheStats {
            hits: 2,
            misses: 0,
            ..Default::default()
        };
        let resp = StatsResponse::new(users, images, 3, 4);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.cached_sessions, 3);
        assert_eq!(resp.rate_buckets, 4);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(CacheStats::new(), CacheStats::new(), 0, 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
