//! Session Module
//!
//! Opaque-token sessions: creation at login, resolution on every request,
//! revocation at logout and a periodic sweep of idle rows.
//!
//! # Lifecycle
//! `Created -> Active` (each successful resolve bumps `last_seen_at`)
//! `-> Revoked | Expired -> Gone`

mod cookie;
mod store;
pub mod token;

pub use cookie::{CookiePolicy, SameSite, DEFAULT_COOKIE_MAX_AGE_SECS};
pub use store::{NewSession, SessionSettings, SessionStore};
