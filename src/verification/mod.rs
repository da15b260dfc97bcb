//! # Verification Module
//!
//! Out-of-band flows driven by single-use, expiring tokens:
//! - Email verification (24 hour tokens)
//! - Password reset (1 hour tokens)
//! - Background sweep of expired tokens

pub mod handlers;
pub mod models;
pub mod repo;
pub mod routes;
pub mod service;

#[cfg(test)]
mod tests;

pub use routes::verification_routes;
pub use service::spawn_expired_token_sweeper;
