// crates/backend-lib/src/middleware/mod.rs

//! Session-aware request extractors for the Jokes server.

pub mod extract;

pub use extract::{CurrentUserId, MaybeUserId};
