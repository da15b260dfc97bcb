//! # Auth Module
//!
//! Sign-in and sessions:
//! - credential sign-in against argon2 password hashes
//! - Google and GitHub sign-in with account linking
//! - HS256 session tokens carried as bearer header or cookie
//! - `AuthedUser` extractor and the page route guard

pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod password;
pub mod routes;
pub mod session;


pub use guard::route_guard;
pub use routes::auth_routes;
pub use session::SessionIssuer;
