//! Brand Service - moderation backend for user-submitted brand images
//!
//! Read-through entity caches, opaque-token sessions and per-client rate
//! limiting in front of a persistent store.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod session;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use coordinator::{Coordinator, Stores};
pub use error::{CoreError, Result};
