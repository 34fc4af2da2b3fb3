//! Session Store Module
//!
//! Maps opaque session tokens to user identities. The persistent session
//! table is authoritative; this process keeps a short-lived
//! `token -> identity` cache in front of it.
//!
//! No cache lock is held while a store call is in flight: every resolution
//! reads the cache, releases it, talks to the store, then re-takes the lock
//! to publish the result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{token, CookiePolicy};
use crate::cache::EntityCache;
use crate::clock::SharedClock;
use crate::config::{bounded_secs, Config};
use crate::error::{CoreError, Result};
use crate::models::{Identity, SessionRow, User};
use crate::store::{bounded, SessionRepository};

// == Settings ==
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Lifetime of a resolved-user cache entry
    pub cache_ttl: Duration,
    /// Inactivity after which a session row is dead
    pub max_idle: Duration,
    /// Re-check the session row on every cache hit
    pub revalidate: bool,
    /// Delete the session row on revoke instead of leaving it for the sweep
    pub revoke_deletes_row: bool,
    /// Bound on every store call
    pub timeout: StdDuration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache_ttl: bounded_secs(config.session_cache_ttl),
            max_idle: bounded_secs(config.session_max_idle),
            revalidate: config.session_revalidate,
            revoke_deletes_row: config.session_revoke_deletes_row,
            timeout: config.store_timeout(),
        }
    }
}

/// A freshly created session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    /// `Set-Cookie` value delivering the token
    pub cookie: String,
}

#[derive(Debug, Clone)]
enum CachedSession {
    Resolved {
        identity: Identity,
        cached_at: DateTime<Utc>,
    },
    /// Rejected by this process until `until`, whatever the store says
    Revoked { until: DateTime<Utc> },
}

enum Lookup {
    Hit(Identity),
    Revoked,
    Miss,
}

// == Session Store ==
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    users: Arc<EntityCache<User>>,
    clock: SharedClock,
    settings: SessionSettings,
    cache: RwLock<HashMap<String, CachedSession>>,
}

impl SessionStore {
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        users: Arc<EntityCache<User>>,
        clock: SharedClock,
        settings: SessionSettings,
    ) -> Self {
        Self {
            repo,
            users,
            clock,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // == Create ==
    /// Starts a session for `user`, replacing any session the user already had.
    pub async fn create_session(&self, user: &Identity, cookie: &CookiePolicy) -> Result<NewSession> {
        let token = token::generate();
        let now = self.clock.now();
        let row = SessionRow {
            token: token.clone(),
            user_id: user.id,
            created_at: now,
            last_seen_at: now,
        };
        bounded(self.settings.timeout, "sessions.upsert", self.repo.upsert_for_user(row)).await?;

        {
            let mut cache = self.cache.write();
            cache.retain(|_, entry| {
                !matches!(entry, CachedSession::Resolved { identity, .. } if identity.id == user.id)
            });
            cache.insert(
                token.clone(),
                CachedSession::Resolved {
                    identity: user.clone(),
                    cached_at: now,
                },
            );
        }

        info!(user_id = user.id, login = %user.login, "Created session");
        Ok(NewSession {
            cookie: cookie.session_cookie(&token, now),
            token,
        })
    }

    // == Resolve ==
    /// Resolves a token to the identity it was issued for.
    ///
    /// A cached identity is only trusted within the cache TTL, and even then
    /// the session row is re-checked unless revalidation is switched off.
    /// Every resolution that reaches the store bumps the row's `last_seen_at`;
    /// with revalidation off a fresh cache hit touches nothing.
    pub async fn resolve(&self, token: &str) -> Result<Identity> {
        if !token::is_well_formed(token) {
            return Err(CoreError::SessionNotFound);
        }

        let now = self.clock.now();
        let cached = match self.lookup(token, now) {
            Lookup::Revoked => return Err(CoreError::SessionNotFound),
            Lookup::Hit(identity) if !self.settings.revalidate => return Ok(identity),
            Lookup::Hit(identity) => Some(identity),
            Lookup::Miss => None,
        };

        let row = bounded(self.settings.timeout, "sessions.get", self.repo.get(token)).await?;
        let Some(row) = row else {
            self.forget(token);
            return Err(CoreError::SessionNotFound);
        };

        if now - row.last_seen_at > self.settings.max_idle {
            self.forget(token);
            return Err(CoreError::SessionExpired);
        }

        let touched =
            bounded(self.settings.timeout, "sessions.touch", self.repo.touch(token, now)).await?;
        if !touched {
            self.forget(token);
            return Err(CoreError::SessionNotFound);
        }

        let (identity, refreshed) = match cached {
            Some(identity) if identity.id == row.user_id => (identity, false),
            _ => {
                let user = self
                    .users
                    .get(row.user_id)
                    .await?
                    .ok_or(CoreError::SessionNotFound)?;
                (Identity::from(&user), true)
            }
        };

        let mut cache = self.cache.write();
        // A revoke may have landed while the store calls were in flight.
        if let Some(CachedSession::Revoked { .. }) = cache.get(token) {
            return Err(CoreError::SessionNotFound);
        }
        if refreshed {
            cache.insert(
                token.to_string(),
                CachedSession::Resolved {
                    identity: identity.clone(),
                    cached_at: now,
                },
            );
        }

        debug!(user_id = identity.id, "Resolved session");
        Ok(identity)
    }

    // == Revoke ==
    /// Ends a session as seen by this process, immediately.
    ///
    /// With `revoke_deletes_row` the session row is deleted as well. Without
    /// it the row stays until the next sweep: this process rejects the token
    /// at once, but other processes sharing the store keep accepting it until
    /// the row is swept.
    ///
    /// Malformed or never-issued tokens are ignored, so no revocation marker
    /// is ever held for a token that had no session.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        if !token::is_well_formed(token) {
            debug!("Ignoring revoke of malformed token");
            return Ok(());
        }

        let cached = self.cache.read().contains_key(token);
        let had_row = if self.settings.revoke_deletes_row {
            bounded(self.settings.timeout, "sessions.delete", self.repo.delete(token)).await?
        } else {
            bounded(self.settings.timeout, "sessions.get", self.repo.get(token))
                .await?
                .is_some()
        };
        if !cached && !had_row {
            debug!("Ignoring revoke of unknown token");
            return Ok(());
        }

        let hold = if self.settings.revoke_deletes_row {
            self.settings.cache_ttl
        } else {
            self.settings.max_idle
        };
        self.cache.write().insert(
            token.to_string(),
            CachedSession::Revoked {
                until: self.clock.now() + hold,
            },
        );

        info!(
            deleted_row = self.settings.revoke_deletes_row,
            "Revoked session"
        );
        Ok(())
    }

    // == Sweep ==
    /// Deletes session rows idle for longer than `max_idle` and prunes
    /// expired local cache entries. Returns the number of rows deleted.
    pub async fn sweep_expired(&self, max_idle: Duration) -> Result<u64> {
        let now = self.clock.now();
        let cutoff = now - max_idle;
        let removed = bounded(
            self.settings.timeout,
            "sessions.sweep",
            self.repo.delete_idle_since(cutoff),
        )
        .await?;

        let pruned = self.prune(now);
        info!(removed, pruned, cutoff = %cutoff, "Swept expired sessions");
        Ok(removed)
    }

    /// Resolved-user cache entries currently held.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .values()
            .filter(|entry| matches!(entry, CachedSession::Resolved { .. }))
            .count()
    }

    // == Internals ==
    fn lookup(&self, token: &str, now: DateTime<Utc>) -> Lookup {
        match self.cache.read().get(token) {
            Some(CachedSession::Revoked { until }) if *until > now => Lookup::Revoked,
            Some(CachedSession::Resolved {
                identity,
                cached_at,
            }) if now - *cached_at <= self.settings.cache_ttl => Lookup::Hit(identity.clone()),
            _ => Lookup::Miss,
        }
    }

    fn forget(&self, token: &str) {
        let mut cache = self.cache.write();
        if let Some(CachedSession::Resolved { .. }) = cache.get(token) {
            cache.remove(token);
        }
    }

    fn prune(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.settings.cache_ttl;
        let mut cache = self.cache.write();
        let before = cache.len();
        cache.retain(|_, entry| match entry {
            CachedSession::Resolved { cached_at, .. } => now - *cached_at <= ttl,
            CachedSession::Revoked { until } => *until > now,
        });
        before - cache.len()
    }
}
