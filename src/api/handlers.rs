//! API Handlers
//!
//! Thin HTTP glue over the coordinator: extract the session cookie and query
//! parameters, call one coordinator operation, serialize the outcome.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::coordinator::{Coordinator, Stores};
use crate::error::{CoreError, Result};
use crate::models::{
    HealthResponse, IdQuery, Identity, Image, MessageResponse, PendingQuery, StatsResponse, User,
};
use crate::session::CookiePolicy;

/// Header a TLS-terminating proxy sets to the scheme the client used.
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    /// Builds a coordinator over in-memory stores and the system clock.
    pub fn from_config(config: &Config) -> Self {
        let coordinator = Coordinator::new(config.clone(), Stores::memory(), Arc::new(SystemClock));
        Self::new(Arc::new(coordinator))
    }

    /// Cookie policy for one request, with `Secure` forced on when the
    /// request arrived over HTTPS.
    pub fn cookie_policy(&self, headers: &HeaderMap) -> CookiePolicy {
        self.coordinator
            .config()
            .cookie
            .for_transport(is_secure_transport(headers))
    }

    /// Resolves the caller from the session cookie.
    async fn actor(&self, headers: &HeaderMap) -> Result<User> {
        let token = self
            .coordinator
            .config()
            .cookie
            .token_from_headers(headers)
            .ok_or(CoreError::SessionNotFound)?;
        self.coordinator.actor(&token).await
    }
}

fn is_secure_transport(headers: &HeaderMap) -> bool {
    headers
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Cache counters, cached session count and live bucket count.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.coordinator.stats())
}

/// Handler for GET /session
///
/// Returns the identity behind the session cookie, 401 without one.
pub async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Identity>> {
    let user = state.actor(&headers).await?;
    Ok(Json(Identity::from(&user)))
}

/// Handler for POST /logout
///
/// Revokes the session if there is one and always clears the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<([(header::HeaderName, String); 1], Json<MessageResponse>)> {
    let policy = state.cookie_policy(&headers);
    if let Some(token) = policy.token_from_headers(&headers) {
        state.coordinator.logout(&token).await?;
    }

    Ok((
        [(header::SET_COOKIE, policy.clearing_cookie())],
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

/// Handler for GET /brand/list
///
/// Images owned by the caller.
pub async fn list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Image>>> {
    let actor = state.actor(&headers).await?;
    let images = state.coordinator.images_for_user(actor.id).await?;
    tracing::debug!(user_id = actor.id, count = images.len(), "Listing images");
    Ok(Json(images))
}

/// Handler for DELETE /brand/delete?id=
pub async fn delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Json<MessageResponse>> {
    let actor = state.actor(&headers).await?;
    let id = query.parse()?;
    state.coordinator.delete_image(&actor, id).await?;
    Ok(Json(MessageResponse::new(format!("Image {} deleted", id))))
}

/// Handler for GET /ads/pending[?user=]
///
/// Admin and staff only.
pub async fn pending_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<Image>>> {
    let actor = state.actor(&headers).await?;
    let images = state.coordinator.pending_images(&actor, query.user).await?;
    Ok(Json(images))
}

/// Handler for POST /ads/pending/accept?id=
pub async fn accept_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Json<Image>> {
    let actor = state.actor(&headers).await?;
    let id = query.parse()?;
    let image = state.coordinator.approve_image(&actor, id).await?;
    Ok(Json(image))
}
