//! Verification token persistence
//!
//! Tokens are strictly create / consume-once / delete. There is no update.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::models::{TokenPurpose, VerificationToken};
use crate::common::ApiError;

pub async fn create_token(pool: &SqlitePool, token: &VerificationToken) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO verification_tokens (token, identifier, purpose, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&token.token)
    .bind(&token.identifier)
    .bind(token.purpose)
    .bind(token.expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove every token of `purpose` issued for `identifier`; returns how many
pub async fn delete_tokens_for_identifier(
    pool: &SqlitePool,
    identifier: &str,
    purpose: TokenPurpose,
) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM verification_tokens WHERE identifier = ? AND purpose = ?")
        .bind(identifier)
        .bind(purpose)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a token and return it, in one statement
///
/// Of any number of concurrent callers presenting the same token, exactly
/// one receives `Some`.
pub async fn take_token(
    pool: &SqlitePool,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Option<VerificationToken>, ApiError> {
    let taken = sqlx::query_as::<_, VerificationToken>(
        r#"
        DELETE FROM verification_tokens
        WHERE token = ? AND purpose = ?
        RETURNING identifier, token, purpose, expires_at
        "#,
    )
    .bind(token)
    .bind(purpose)
    .fetch_optional(pool)
    .await?;
    Ok(taken)
}

#[cfg(test)]
pub async fn find_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<VerificationToken>, ApiError> {
    let found = sqlx::query_as::<_, VerificationToken>(
        "SELECT identifier, token, purpose, expires_at FROM verification_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(found)
}

/// Delete tokens that expired before `now`; returns how many
pub async fn purge_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
