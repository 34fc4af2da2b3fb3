//! Rate limiting middleware
//!
//! Every request spends one token from its client's bucket before reaching
//! a handler. Rejected requests get 429 with a `Retry-After` header.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use super::handlers::AppState;
use crate::error::Result;
use crate::ratelimit::client_key;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    state.coordinator.limiter().check(&client)?;
    Ok(next.run(request).await)
}
