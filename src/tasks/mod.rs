//! Background Tasks Module
//!
//! Periodic maintenance that runs for the lifetime of the server.
//!
//! # Tasks
//! - Session sweep: deletes session rows idle past the inactivity lifetime
//! - Bucket eviction: drops rate-limit buckets of clients that went quiet
//!
//! Every task sleeps first, then works, and stops at the next wake-up once
//! its cancellation token fires. A failed cycle is logged and the next one
//! runs on schedule.

mod eviction;
mod sweep;

pub use eviction::spawn_bucket_eviction;
pub use sweep::spawn_session_sweep;
