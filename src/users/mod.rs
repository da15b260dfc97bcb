//! # Users Module
//!
//! Local user records and the operations on them:
//! - Credential registration
//! - User lookup by email
//! - Repository functions shared with the auth and verification modules

pub mod handlers;
pub mod models;
pub mod repo;
pub mod routes;
pub mod validators;


pub use models::User;
pub use routes::users_routes;
