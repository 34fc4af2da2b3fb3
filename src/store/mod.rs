//! Persistent Store Module
//!
//! Traits for the durable store the caches mirror, plus an in-memory backend.
//! The store is authoritative; every call made through the core is bounded by
//! a timeout so a stalled backend fails the request instead of hanging it.

mod memory;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::models::{Entity, SessionRow};

pub use memory::MemoryStore;

// == Repository ==
/// Row-level access to one entity collection.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Point query by primary key.
    async fn get(&self, id: E::Key) -> Result<Option<E>>;

    /// Full scan ordered by key descending.
    async fn list(&self) -> Result<Vec<E>>;

    /// Inserts or replaces a row and returns it as stored. Backends assign
    /// keys for records that arrive without one.
    async fn upsert(&self, record: E) -> Result<E>;

    /// Removes a row; `false` when no row had that key.
    async fn delete(&self, id: E::Key) -> Result<bool>;
}

// == Session Repository ==
/// Access to the persistent session table.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores `row`, replacing any existing session of the same user.
    async fn upsert_for_user(&self, row: SessionRow) -> Result<()>;

    async fn get(&self, token: &str) -> Result<Option<SessionRow>>;

    /// Bumps `last_seen_at`; `false` when the row is gone.
    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<bool>;

    async fn delete(&self, token: &str) -> Result<bool>;

    /// Deletes rows last seen strictly before `cutoff`, returning how many.
    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// == Bounded Call ==
/// Runs a store call with an upper bound on its duration.
///
/// A timeout surfaces as [`CoreError::StoreUnavailable`].
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::StoreUnavailable(format!(
            "{} timed out after {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let ok: Result<u32> = bounded(Duration::from_millis(50), "op", async { Ok(3) }).await;
        assert_eq!(ok.unwrap(), 3);

        let err: Result<u32> = bounded(Duration::from_millis(50), "op", async {
            Err(CoreError::StoreUnavailable("boom".to_string()))
        })
        .await;
        assert_eq!(err, Err(CoreError::StoreUnavailable("boom".to_string())));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded(Duration::from_millis(20), "images.list", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(CoreError::StoreUnavailable(msg)) => assert!(msg.contains("images.list")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
