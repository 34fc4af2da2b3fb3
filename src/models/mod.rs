//! Entity schemas and HTTP DTOs
//!
//! `entities` holds the canonical records shared by the caches and the
//! persistent store; `requests`/`responses` are the HTTP bodies.

pub mod entities;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use entities::{Entity, Identity, Image, SessionRow, User};
pub use requests::{IdQuery, PendingQuery};
pub use responses::{HealthResponse, MessageResponse, StatsResponse};
