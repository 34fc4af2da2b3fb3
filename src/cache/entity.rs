//! Entity Cache Module
//!
//! Read-through, write-through mirror of one persistent collection.
//!
//! The live [`CacheSet`] sits behind an `Arc` that is swapped, never edited in
//! place while shared: readers clone the `Arc` and work on a snapshot that no
//! writer can change underneath them. Staleness is decided for the whole set;
//! once the TTL lapses the set is dropped and the next `list` rebuilds it from
//! a single scan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::{CacheSet, CacheStats};
use crate::clock::SharedClock;
use crate::error::{CoreError, Result};
use crate::models::Entity;
use crate::store::{bounded, Repository};

// == Entity Cache ==
pub struct EntityCache<E: Entity> {
    /// Authoritative backing collection
    repo: Arc<dyn Repository<E>>,
    clock: SharedClock,
    /// Maximum age of a set before it is discarded
    ttl: Duration,
    /// Bound on every store call
    timeout: StdDuration,
    /// Currently published snapshot
    current: RwLock<Option<Arc<CacheSet<E>>>>,
    /// Serializes full reloads and cache-side write application
    gate: tokio::sync::Mutex<()>,
    /// Bumped whenever the published set changes through a write or reload
    generation: AtomicU64,
    stats: Mutex<CacheStats>,
}

impl<E: Entity> EntityCache<E> {
    // == Constructor ==
    pub fn new(
        repo: Arc<dyn Repository<E>>,
        clock: SharedClock,
        ttl: Duration,
        timeout: StdDuration,
    ) -> Self {
        Self {
            repo,
            clock,
            ttl,
            timeout,
            current: RwLock::new(None),
            gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    // == Get ==
    /// Looks up one record, falling back to the store on a miss.
    ///
    /// A record found in the store is back-filled into the cache unless a
    /// write or reload landed while the query was in flight.
    pub async fn get(&self, id: E::Key) -> Result<Option<E>> {
        if let Some(record) = self.fresh_set().and_then(|set| set.get(&id).cloned()) {
            self.stats.lock().record_hit();
            return Ok(Some(record));
        }

        self.stats.lock().record_miss();
        let seen = self.generation.load(Ordering::SeqCst);
        let found = bounded(self.timeout, &op::<E>("get"), self.repo.get(id)).await?;

        if let Some(record) = &found {
            self.backfill(record.clone(), seen);
        }
        Ok(found)
    }

    /// Like [`get`](Self::get) but treats absence as [`CoreError::NotFound`].
    pub async fn require(&self, id: E::Key) -> Result<E> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{} {}", E::COLLECTION, id)))
    }

    // == List ==
    /// Returns every record, highest key first.
    ///
    /// Served from the cached set while it is complete and fresh; otherwise a
    /// single caller rebuilds it from one full scan while concurrent callers
    /// wait for that result.
    pub async fn list(&self) -> Result<Vec<E>> {
        if let Some(records) = self.cached_list() {
            return Ok(records);
        }

        let _gate = self.gate.lock().await;
        // Another caller may have rebuilt the set while this one waited.
        if let Some(records) = self.cached_list() {
            return Ok(records);
        }

        self.stats.lock().record_miss();
        let rows = bounded(self.timeout, &op::<E>("list"), self.repo.list()).await?;
        let set = Arc::new(CacheSet::loaded(rows, self.clock.now()));
        let records = set.records();

        {
            // Bumped under the guard so no back-fill can slip in between
            let mut current = self.current.write();
            *current = Some(set);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.lock().record_reload();

        info!(
            collection = E::COLLECTION,
            entries = records.len(),
            "Reloaded entity cache"
        );
        Ok(records)
    }

    // == Upsert ==
    /// Writes a record through to the store, then mirrors the stored row.
    ///
    /// Nothing in the cache changes when the store rejects the write.
    pub async fn upsert(&self, record: E) -> Result<E> {
        record.validate()?;
        let stored = bounded(self.timeout, &op::<E>("upsert"), self.repo.upsert(record)).await?;

        let _gate = self.gate.lock().await;
        self.apply(|set| set.upsert(stored.clone()));
        debug!(collection = E::COLLECTION, id = %stored.key(), "Cached upserted record");
        Ok(stored)
    }

    // == Delete ==
    /// Deletes a record from the store, then from the cached set.
    pub async fn delete(&self, id: E::Key) -> Result<()> {
        let removed = bounded(self.timeout, &op::<E>("delete"), self.repo.delete(id)).await?;

        let _gate = self.gate.lock().await;
        self.apply(|set| {
            set.remove(&id);
        });

        if removed {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("{} {}", E::COLLECTION, id)))
        }
    }

    // == Maintenance ==
    /// Drops the current set; the next read goes to the store.
    pub fn invalidate(&self) {
        *self.current.write() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.total_entries = self.current.read().as_ref().map_or(0, |set| set.len());
        stats
    }

    // == Internals ==
    /// Current set if it is younger than the TTL; a stale set is discarded.
    fn fresh_set(&self) -> Option<Arc<CacheSet<E>>> {
        let set = self.current.read().clone()?;
        if !set.is_stale(self.clock.now(), self.ttl) {
            return Some(set);
        }

        let mut current = self.current.write();
        if current.as_ref().is_some_and(|live| Arc::ptr_eq(live, &set)) {
            *current = None;
            debug!(
                collection = E::COLLECTION,
                loaded_at = %set.loaded_at(),
                "Discarded stale entity set"
            );
        }
        None
    }

    fn cached_list(&self) -> Option<Vec<E>> {
        let set = self.fresh_set().filter(|set| set.is_complete())?;
        self.stats.lock().record_hit();
        Some(set.records())
    }

    /// Copy-on-write change to the published set, if one exists.
    fn apply(&self, change: impl FnOnce(&mut CacheSet<E>)) {
        let mut current = self.current.write();
        if let Some(set) = current.as_mut() {
            change(Arc::make_mut(set));
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn backfill(&self, record: E, seen: u64) {
        let now = self.clock.now();
        let mut current = self.current.write();
        if self.generation.load(Ordering::SeqCst) != seen {
            return;
        }

        match current.as_mut() {
            Some(set) if !set.is_stale(now, self.ttl) => Arc::make_mut(set).upsert(record),
            _ => {
                let mut set = CacheSet::partial(now);
                set.upsert(record);
                *current = Some(Arc::new(set));
            }
        }
    }
}

fn op<E: Entity>(name: &str) -> String {
    format!("{}.{}", E::COLLECTION, name)
}
