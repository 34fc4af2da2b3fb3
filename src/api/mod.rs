//! API Module
//!
//! HTTP handlers and routing for the moderation service.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache, session and rate-limit counters
//! - `GET /session` - Identity behind the session cookie
//! - `POST /logout` - Revoke the session and clear the cookie
//! - `GET /brand/list` - Images owned by the caller
//! - `DELETE /brand/delete?id=` - Delete an image
//! - `GET /ads/pending[?user=]` - Images awaiting moderation
//! - `POST /ads/pending/accept?id=` - Approve an image

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::rate_limit_middleware;
pub use routes::create_router;
