//! Cache Set Module
//!
//! An immutable-by-convention snapshot of one entity collection. Writers clone
//! it, change the clone and publish the result; readers keep whichever
//! snapshot they already hold.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::Entity;

// == Cache Set ==
/// Records of one collection keyed by id, plus the time the set was built.
#[derive(Debug, Clone)]
pub struct CacheSet<E: Entity> {
    /// Records ordered by key
    records: BTreeMap<E::Key, E>,
    /// When the set was loaded (or first back-filled)
    loaded_at: DateTime<Utc>,
    /// True when built from a full scan of the store
    complete: bool,
}

impl<E: Entity> CacheSet<E> {
    // == Constructors ==
    /// Builds a complete set from a full store scan.
    pub fn loaded(rows: impl IntoIterator<Item = E>, at: DateTime<Utc>) -> Self {
        let mut set = Self::partial(at);
        for row in rows {
            set.upsert(row);
        }
        set.complete = true;
        set
    }

    /// Starts an empty set that only holds point-lookup back-fills.
    ///
    /// A partial set answers `get` but never `list`.
    pub fn partial(at: DateTime<Utc>) -> Self {
        Self {
            records: BTreeMap::new(),
            loaded_at: at,
            complete: false,
        }
    }

    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.records.get(key)
    }

    /// Replaces the record with the same key, or adds it.
    pub fn upsert(&mut self, record: E) {
        self.records.insert(record.key(), record);
    }

    pub fn remove(&mut self, key: &E::Key) -> Option<E> {
        self.records.remove(key)
    }

    /// All records, highest key first.
    pub fn records(&self) -> Vec<E> {
        self.records.values().rev().cloned().collect()
    }

    // == Staleness ==
    /// A set is stale once strictly more than `ttl` has passed since it was loaded.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.loaded_at > ttl
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
