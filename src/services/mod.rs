// src/services/mod.rs
//
// Outbound integrations used by the domain modules

pub mod email;
pub mod ses;
pub mod smtp;

pub use email::build_sender;
