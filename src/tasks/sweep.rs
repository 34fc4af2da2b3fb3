//! Session Sweep Task
//!
//! Background task that periodically deletes idle session rows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::SessionStore;

/// Spawns the session sweep.
///
/// Each cycle deletes rows whose `last_seen_at` is older than the store's
/// configured inactivity lifetime. Store failures are logged and retried on
/// the next cycle.
///
/// # Returns
/// A JoinHandle that completes once `cancel` fires.
pub fn spawn_session_sweep(
    sessions: Arc<SessionStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting session sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let max_idle = sessions.settings().max_idle;
            match sessions.sweep_expired(max_idle).await {
                Ok(0) => debug!("Session sweep: no idle sessions found"),
                Ok(removed) => info!("Session sweep: removed {} idle sessions", removed),
                Err(e) => warn!(error = %e, "Session sweep failed, retrying next cycle"),
            }
        }

        info!("Session sweep stopped");
    })
}
