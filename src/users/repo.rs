//! User and linked-account persistence

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::models::{NewUser, User};
use crate::common::error::is_unique_violation;
use crate::common::{generate_account_id, generate_user_id, safe_email_log, ApiError};

const USER_COLUMNS: &str = "id, name, email, password_hash, email_verified_at, created_at";

/// Look up a user by (already normalized) email
pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Insert a user; a duplicate email yields `ApiError::Conflict`
pub async fn create_user(pool: &SqlitePool, new_user: NewUser) -> Result<User, ApiError> {
    let user = User {
        id: generate_user_id(),
        name: new_user.name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        email_verified_at: new_user.email_verified_at,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, email_verified_at, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.password_hash.as_deref())
    .bind(user.email_verified_at)
    .bind(user.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            debug!(email = %safe_email_log(&user.email), "User insert hit unique email constraint");
            ApiError::Conflict("An account with this email already exists".to_string())
        } else {
            ApiError::DatabaseError(e)
        }
    })?;

    info!(user_id = %user.id, email = %safe_email_log(&user.email), "User created");
    Ok(user)
}

/// Set `email_verified_at` unless it is already set; returns whether a row changed
pub async fn mark_email_verified(
    pool: &SqlitePool,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "UPDATE users SET email_verified_at = ? WHERE id = ? AND email_verified_at IS NULL",
    )
    .bind(at)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_password_hash(
    pool: &SqlitePool,
    user_id: &str,
    password_hash: &str,
) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// User linked to a provider identity, if any
pub async fn find_user_by_account(
    pool: &SqlitePool,
    provider: &str,
    provider_account_id: &str,
) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.name, u.email, u.password_hash, u.email_verified_at, u.created_at
        FROM users u
        JOIN accounts a ON a.user_id = u.id
        WHERE a.provider = ? AND a.provider_account_id = ?
        "#,
    )
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Link a provider identity to a user; linking the same identity twice is a no-op
pub async fn link_account(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
    provider_account_id: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, provider, provider_account_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(provider, provider_account_id) DO NOTHING
        "#,
    )
    .bind(generate_account_id())
    .bind(user_id)
    .bind(provider)
    .bind(provider_account_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    info!(user_id = %user_id, provider = %provider, "Provider account linked");
    Ok(())
}
