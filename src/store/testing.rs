//! Instrumented store doubles for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{MemoryStore, Repository, SessionRepository};
use crate::error::{CoreError, Result};
use crate::models::{Entity, SessionRow};

/// Repository that counts calls and can be made slow or broken.
#[derive(Debug)]
pub(crate) struct FakeRepo<E: Entity> {
    rows: Mutex<BTreeMap<E::Key, E>>,
    scans: AtomicUsize,
    point_reads: AtomicUsize,
    failing: AtomicBool,
    scan_delay: Mutex<Option<Duration>>,
}

impl<E: Entity> FakeRepo<E> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            scans: AtomicUsize::new(0),
            point_reads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            scan_delay: Mutex::new(None),
        }
    }

    pub(crate) fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        let repo = Self::new();
        for row in rows {
            repo.put(row);
        }
        repo
    }

    /// Writes straight to the backing rows, bypassing any cache.
    pub(crate) fn put(&self, row: E) {
        self.rows.lock().insert(row.key(), row);
    }

    pub(crate) fn remove(&self, id: E::Key) {
        self.rows.lock().remove(&id);
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub(crate) fn point_reads(&self) -> usize {
        self.point_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_scan_delay(&self, delay: Duration) {
        *self.scan_delay.lock() = Some(delay);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CoreError::StoreUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for FakeRepo<E> {
    async fn get(&self, id: E::Key) -> Result<Option<E>> {
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<E>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let delay = *self.scan_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.rows.lock().values().rev().cloned().collect())
    }

    async fn upsert(&self, record: E) -> Result<E> {
        self.check()?;
        self.put(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: E::Key) -> Result<bool> {
        self.check()?;
        Ok(self.rows.lock().remove(&id).is_some())
    }
}

/// Session table that can be switched into a failing state.
#[derive(Debug, Default)]
pub(crate) struct FakeSessions {
    inner: MemoryStore,
    failing: AtomicBool,
    sweeps: AtomicUsize,
    reads: AtomicUsize,
}

impl FakeSessions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn rows(&self) -> usize {
        self.inner.session_count()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CoreError::StoreUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionRepository for FakeSessions {
    async fn upsert_for_user(&self, row: SessionRow) -> Result<()> {
        self.check()?;
        self.inner.upsert_for_user(row).await
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRow>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        SessionRepository::get(&self.inner, token).await
    }

    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        self.check()?;
        self.inner.touch(token, at).await
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        self.check()?;
        SessionRepository::delete(&self.inner, token).await
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.delete_idle_since(cutoff).await
    }
}
