//! In-memory persistent store
//!
//! Reference backend implementing every repository trait over ordered maps.
//! Used by the binary when no external database is wired in, and by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{Repository, SessionRepository};
use crate::error::Result;
use crate::models::{Image, SessionRow, User};

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<u64, User>>,
    images: RwLock<BTreeMap<u64, Image>>,
    sessions: RwLock<HashMap<String, SessionRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows, including revoked rows awaiting a sweep.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[async_trait]
impl Repository<User> for MemoryStore {
    async fn get(&self, id: u64) -> Result<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.read().values().rev().cloned().collect())
    }

    async fn upsert(&self, record: User) -> Result<User> {
        self.users.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.users.write().remove(&id).is_some())
    }
}

#[async_trait]
impl Repository<Image> for MemoryStore {
    async fn get(&self, id: u64) -> Result<Option<Image>> {
        Ok(self.images.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Image>> {
        Ok(self.images.read().values().rev().cloned().collect())
    }

    async fn upsert(&self, mut record: Image) -> Result<Image> {
        let mut images = self.images.write();
        if record.id == 0 {
            record.id = images.keys().next_back().map_or(1, |last| last + 1);
        }
        images.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.images.write().remove(&id).is_some())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn upsert_for_user(&self, row: SessionRow) -> Result<()> {
        let mut sessions = self.sessions.write();
        sessions.retain(|_, existing| existing.user_id != row.user_id);
        sessions.insert(row.token.clone(), row);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRow>> {
        Ok(self.sessions.read().get(token).cloned())
    }

    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        match self.sessions.write().get_mut(token) {
            Some(row) => {
                row.last_seen_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        Ok(self.sessions.write().remove(token).is_some())
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, row| row.last_seen_at >= cutoff);
        Ok((before - sessions.len()) as u64)
    }
}
