//! Bucket Eviction Task
//!
//! Background task that drops rate-limit buckets of idle clients so the
//! bucket map stays bounded by the number of recently active clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ratelimit::RateLimiter;

/// Spawns the bucket eviction loop.
///
/// # Returns
/// A JoinHandle that completes once `cancel` fires.
pub fn spawn_bucket_eviction(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting bucket eviction with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = limiter.evict_idle();
            if removed > 0 {
                info!(
                    "Bucket eviction: removed {} idle buckets, {} remain",
                    removed,
                    limiter.len()
                );
            } else {
                debug!("Bucket eviction: no idle buckets found");
            }
        }

        info!("Bucket eviction stopped");
    })
}
