//! Coordinator Module
//!
//! Owns the long-lived pieces of the service: both entity caches, the
//! session store, the rate limiter and the background tasks that maintain
//! them. Request handlers talk to the coordinator only.
//!
//! # Lifecycle
//! `new` -> `warm` -> `start` -> ... -> `shutdown`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::EntityCache;
use crate::clock::SharedClock;
use crate::config::{bounded_secs, Config};
use crate::error::{CoreError, Result};
use crate::models::{Identity, Image, StatsResponse, User};
use crate::ratelimit::{RateLimitSettings, RateLimiter};
use crate::session::{CookiePolicy, NewSession, SessionSettings, SessionStore};
use crate::store::{MemoryStore, Repository, SessionRepository};
use crate::tasks::{spawn_bucket_eviction, spawn_session_sweep};

// == Stores ==
/// Persistent backends the coordinator reads through.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn Repository<User>>,
    pub images: Arc<dyn Repository<Image>>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    /// Every table backed by one shared in-memory store.
    pub fn memory() -> Self {
        Self::from_shared(Arc::new(MemoryStore::new()))
    }

    pub fn from_shared(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            images: store.clone(),
            sessions: store,
        }
    }
}

// == Coordinator ==
pub struct Coordinator {
    config: Config,
    clock: SharedClock,
    users: Arc<EntityCache<User>>,
    images: Arc<EntityCache<Image>>,
    sessions: Arc<SessionStore>,
    limiter: Arc<RateLimiter>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    pub fn new(config: Config, stores: Stores, clock: SharedClock) -> Self {
        let ttl = bounded_secs(config.entity_cache_ttl);
        let timeout = config.store_timeout();

        let users = Arc::new(EntityCache::new(stores.users, clock.clone(), ttl, timeout));
        let images = Arc::new(EntityCache::new(stores.images, clock.clone(), ttl, timeout));
        let sessions = Arc::new(SessionStore::new(
            stores.sessions,
            users.clone(),
            clock.clone(),
            SessionSettings::from(&config),
        ));
        let limiter = Arc::new(RateLimiter::new(
            clock.clone(),
            RateLimitSettings::from(&config),
        ));

        Self {
            config,
            clock,
            users,
            images,
            sessions,
            limiter,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn users(&self) -> &Arc<EntityCache<User>> {
        &self.users
    }

    pub fn images(&self) -> &Arc<EntityCache<Image>> {
        &self.images
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    // == Lifecycle ==
    /// Loads both entity caches once. Failures are logged; the caches load
    /// lazily on first use instead.
    pub async fn warm(&self) {
        match self.users.list().await {
            Ok(users) => info!(count = users.len(), "Warmed user cache"),
            Err(e) => warn!(error = %e, "User cache warm-up failed"),
        }
        match self.images.list().await {
            Ok(images) => info!(count = images.len(), "Warmed image cache"),
            Err(e) => warn!(error = %e, "Image cache warm-up failed"),
        }
    }

    /// Spawns the session sweep and bucket eviction. Calling it again while
    /// the tasks run is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() || self.shutdown.is_cancelled() {
            return;
        }

        tasks.push(spawn_session_sweep(
            self.sessions.clone(),
            Duration::from_secs(self.config.session_sweep_interval),
            self.shutdown.child_token(),
        ));
        tasks.push(spawn_bucket_eviction(
            self.limiter.clone(),
            Duration::from_secs(self.config.rate_limit_evict_interval),
            self.shutdown.child_token(),
        ));
        info!("Background tasks started");
    }

    /// Signals every background task to stop and waits for them to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Background tasks stopped");
    }

    pub fn stats(&self) -> StatsResponse {
        StatsResponse::new(
            self.users.stats(),
            self.images.stats(),
            self.sessions.cached_len(),
            self.limiter.len(),
        )
    }

    // == Sessions ==
    /// Binds an externally authenticated profile to a local user and opens a
    /// session for it. Moderation flags of an existing user are preserved.
    pub async fn login(&self, profile: &Identity, cookie: &CookiePolicy) -> Result<(User, NewSession)> {
        let now = self.clock.now();
        let user = match self.users.get(profile.id).await? {
            Some(mut existing) => {
                existing.login = profile.login.clone();
                existing.avatar_url = profile.avatar_url.clone();
                existing.updated_at = now;
                existing
            }
            None => User::new(profile.id, &profile.login, &profile.avatar_url, now),
        };
        let user = self.users.upsert(user).await?;

        let session = self.sessions.create_session(&Identity::from(&user), cookie).await?;
        info!(user_id = user.id, login = %user.login, "User logged in");
        Ok((user, session))
    }

    /// Resolves a session token to the full user record behind it.
    pub async fn actor(&self, token: &str) -> Result<User> {
        let identity = self.sessions.resolve(token).await?;
        self.users
            .get(identity.id)
            .await?
            .ok_or(CoreError::SessionNotFound)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token).await
    }

    // == Images ==
    /// Submits `image_url` as `actor`'s image. Each user has at most one
    /// image; resubmitting replaces it and sends it back to moderation.
    pub async fn submit_image(&self, actor: &User, image_url: &str) -> Result<Image> {
        if actor.banned {
            return Err(CoreError::Forbidden(format!("user {} is banned", actor.login)));
        }

        let now = self.clock.now();
        let mut image = self
            .images
            .list()
            .await?
            .into_iter()
            .find(|image| image.user_id == actor.id)
            .unwrap_or_else(|| Image::pending(actor.id, image_url, now));
        image.image_url = image_url.to_string();
        image.created_at = now;
        image.pending = !actor.is_trusted();

        let image = self.images.upsert(image).await?;
        info!(
            image_id = image.id,
            user_id = actor.id,
            auto_approved = !image.pending,
            "Image submitted"
        );
        Ok(image)
    }

    /// Approves a pending image. Only admins and staff may approve.
    pub async fn approve_image(&self, actor: &User, id: u64) -> Result<Image> {
        require_moderator(actor)?;

        let mut image = self.images.require(id).await?;
        image.pending = false;
        image.created_at = self.clock.now();

        let image = self.images.upsert(image).await?;
        info!(image_id = id, moderator = %actor.login, "Image approved");
        Ok(image)
    }

    /// Deletes an image. Allowed for its owner, admins and staff.
    pub async fn delete_image(&self, actor: &User, id: u64) -> Result<()> {
        let image = self.images.require(id).await?;
        if image.user_id != actor.id && !actor.is_moderator() {
            return Err(CoreError::Forbidden(format!(
                "user {} may not delete image {}",
                actor.login, id
            )));
        }

        self.images.delete(id).await?;
        info!(image_id = id, actor = %actor.login, "Image deleted");
        Ok(())
    }

    pub async fn images_for_user(&self, user_id: u64) -> Result<Vec<Image>> {
        Ok(self
            .images
            .list()
            .await?
            .into_iter()
            .filter(|image| image.user_id == user_id)
            .collect())
    }

    /// Images awaiting moderation, optionally narrowed to one owner.
    pub async fn pending_images(&self, actor: &User, user: Option<u64>) -> Result<Vec<Image>> {
        require_moderator(actor)?;

        Ok(self
            .images
            .list()
            .await?
            .into_iter()
            .filter(|image| image.pending)
            .filter(|image| user.map_or(true, |id| image.user_id == id))
            .collect())
    }

    /// Approved images whose owners are not banned.
    pub async fn visible_images(&self) -> Result<Vec<Image>> {
        let banned: HashSet<u64> = self
            .users
            .list()
            .await?
            .into_iter()
            .filter(|user| user.banned)
            .map(|user| user.id)
            .collect();

        Ok(self
            .images
            .list()
            .await?
            .into_iter()
            .filter(|image| !image.pending && !banned.contains(&image.user_id))
            .collect())
    }

    // == User moderation ==
    pub async fn verify_user(&self, actor: &User, id: u64) -> Result<User> {
        require_admin(actor)?;
        self.update_user(id, |user| user.verified = true).await
    }

    pub async fn staff_user(&self, actor: &User, id: u64) -> Result<User> {
        require_admin(actor)?;
        self.update_user(id, |user| user.is_staff = true).await
    }

    /// Bans a user and removes every image they own.
    pub async fn ban_user(&self, actor: &User, id: u64) -> Result<User> {
        require_moderator(actor)?;
        let user = self.update_user(id, |user| user.banned = true).await?;

        for image in self.images_for_user(id).await? {
            match self.images.delete(image.id).await {
                Ok(()) | Err(CoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(user_id = id, moderator = %actor.login, "User banned");
        Ok(user)
    }

    pub async fn unban_user(&self, actor: &User, id: u64) -> Result<User> {
        require_moderator(actor)?;
        self.update_user(id, |user| user.banned = false).await
    }

    async fn update_user(&self, id: u64, change: impl FnOnce(&mut User)) -> Result<User> {
        let mut user = self.users.require(id).await?;
        change(&mut user);
        user.updated_at = self.clock.now();
        self.users.upsert(user).await
    }
}

fn require_moderator(actor: &User) -> Result<()> {
    if actor.is_moderator() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "user {} is not admin or staff",
            actor.login
        )))
    }
}

fn require_admin(actor: &User) -> Result<()> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!("user {} is not admin", actor.login)))
    }
}
