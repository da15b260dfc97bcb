//! Password hashing
//!
//! Argon2id with a random salt per hash, stored as a PHC string
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). Verification reads the
//! parameters back from the stored string, so changing the cost settings
//! only affects newly hashed passwords.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tokio::task;

use crate::common::config::env_parse;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("password task failed: {0}")]
    Task(String),
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_cost_kib: u32,
    /// Iterations
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_cost_kib: Params::DEFAULT_M_COST,
            time_cost: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordParams {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_cost_kib: env_parse("ARGON2_MEMORY_COST_KIB", defaults.memory_cost_kib),
            time_cost: env_parse("ARGON2_TIME_COST", defaults.time_cost),
            parallelism: env_parse("ARGON2_PARALLELISM", defaults.parallelism),
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_cost_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

pub fn hash_password(password: &str, params: &PasswordParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// `hash_password` on the blocking pool; Argon2 is CPU bound
pub async fn hash_password_async(
    password: String,
    params: PasswordParams,
) -> Result<String, PasswordError> {
    task::spawn_blocking(move || hash_password(&password, &params))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// `verify_password` on the blocking pool
pub async fn verify_password_async(
    password: String,
    stored_hash: String,
) -> Result<bool, PasswordError> {
    task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

#[cfg(test)]
pub(crate) fn test_params() -> PasswordParams {
    PasswordParams {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}
