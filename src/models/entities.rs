//! Canonical entity schemas
//!
//! One shape per entity, shared by the caches and the persistent store.
//! Every record is validated when it crosses into the store.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

// == Entity Trait ==
/// A record that can be mirrored by an [`EntityCache`](crate::cache::EntityCache).
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Numeric primary key.
    type Key: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static;

    /// Collection name, used in logs and error messages.
    const COLLECTION: &'static str;

    fn key(&self) -> Self::Key;

    /// Checks the record against its schema.
    fn validate(&self) -> Result<()>;
}

// == User ==
/// A moderation user, keyed by the identity provider's numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub is_admin: bool,
    pub is_staff: bool,
    pub verified: bool,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a plain user with no moderation flags.
    pub fn new(id: u64, login: impl Into<String>, avatar_url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            login: login.into(),
            avatar_url: avatar_url.into(),
            is_admin: false,
            is_staff: false,
            verified: false,
            banned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Admins and staff may moderate other users' images.
    pub fn is_moderator(&self) -> bool {
        self.is_admin || self.is_staff
    }

    /// Submissions from these users skip the approval queue.
    pub fn is_trusted(&self) -> bool {
        self.is_moderator() || self.verified
    }
}

impl Entity for User {
    type Key = u64;
    const COLLECTION: &'static str = "users";

    fn key(&self) -> u64 {
        self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(CoreError::InvalidRequest("user id cannot be 0".to_string()));
        }
        if self.login.trim().is_empty() {
            return Err(CoreError::InvalidRequest("user login cannot be empty".to_string()));
        }
        Ok(())
    }
}

// == Image ==
/// A branding image submitted by a user. An `id` of 0 means the store has
/// not assigned one yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub user_id: u64,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
}

impl Image {
    /// Creates an unsaved image awaiting review.
    pub fn pending(user_id: u64, image_url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            image_url: image_url.into(),
            created_at: now,
            pending: true,
        }
    }
}

impl Entity for Image {
    type Key = u64;
    const COLLECTION: &'static str = "images";

    fn key(&self) -> u64 {
        self.id
    }

    fn validate(&self) -> Result<()> {
        if self.user_id == 0 {
            return Err(CoreError::InvalidRequest("image owner cannot be 0".to_string()));
        }
        if self.image_url.trim().is_empty() {
            return Err(CoreError::InvalidRequest("image url cannot be empty".to_string()));
        }
        Ok(())
    }
}

// == Identity ==
/// The user snapshot carried by a session: the upstream profile shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

// == Session Row ==
/// Authoritative session record as kept by the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub token: String,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}
