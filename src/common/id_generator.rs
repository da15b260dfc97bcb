// src/common/id_generator.rs
//! Identifier and token generation
//!
//! Record IDs are prefixed Crockford Base32 strings (`U_K7NP3XQ2`).
//! Bearer tokens for email verification and password reset are 32 random
//! bytes, hex encoded, and carry no structure.

use rand::Rng;
use std::fmt::Write;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters after the prefix; 32^10 combinations per entity type
const ID_LENGTH: usize = 10;

/// Entropy of an opaque token in bytes
pub const OPAQUE_TOKEN_BYTES: usize = 32;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Linked OAuth account (A_)
    Account,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Account => "A",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID, e.g. "U_K7NP3XQ2MW"
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(ID_LENGTH))
}

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_account_id() -> String {
    generate_id(EntityPrefix::Account)
}

/// Generate an unguessable single-purpose bearer token (64 lowercase hex chars)
pub fn generate_opaque_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; OPAQUE_TOKEN_BYTES] = rng.gen();

    bytes
        .iter()
        .fold(String::with_capacity(OPAQUE_TOKEN_BYTES * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
