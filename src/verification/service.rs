//! Token issuance and consumption

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::models::{TokenPurpose, VerificationToken};
use super::repo;
use crate::common::{generate_opaque_token, safe_email_log, safe_token_log, ApiError};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Issue a fresh token for `identifier`, invalidating earlier ones of the same purpose
pub async fn issue_token(
    pool: &SqlitePool,
    identifier: &str,
    purpose: TokenPurpose,
) -> Result<VerificationToken, ApiError> {
    issue_token_at(pool, identifier, purpose, Utc::now()).await
}

pub(crate) async fn issue_token_at(
    pool: &SqlitePool,
    identifier: &str,
    purpose: TokenPurpose,
    now: DateTime<Utc>,
) -> Result<VerificationToken, ApiError> {
    let purged = repo::delete_tokens_for_identifier(pool, identifier, purpose).await?;
    if purged > 0 {
        debug!(
            identifier = %safe_email_log(identifier),
            purpose = purpose.as_str(),
            purged,
            "Purged previous tokens before issuing"
        );
    }

    let token = VerificationToken {
        identifier: identifier.to_string(),
        token: generate_opaque_token(),
        purpose,
        expires_at: now + purpose.ttl(),
    };
    repo::create_token(pool, &token).await?;

    info!(
        identifier = %safe_email_log(identifier),
        purpose = purpose.as_str(),
        expires_at = %token.expires_at,
        "Token issued"
    );
    Ok(token)
}

/// Consume a token exactly once
///
/// Unknown or already used → `InvalidToken`. Past `expires_at` → the token
/// is removed and `ExpiredToken` returned.
pub async fn consume_token(
    pool: &SqlitePool,
    token: &str,
    purpose: TokenPurpose,
) -> Result<VerificationToken, ApiError> {
    consume_token_at(pool, token, purpose, Utc::now()).await
}

pub(crate) async fn consume_token_at(
    pool: &SqlitePool,
    token: &str,
    purpose: TokenPurpose,
    now: DateTime<Utc>,
) -> Result<VerificationToken, ApiError> {
    let Some(taken) = repo::take_token(pool, token, purpose).await? else {
        warn!(token = %safe_token_log(token), purpose = purpose.as_str(), "Unknown or already used token presented");
        return Err(ApiError::InvalidToken);
    };

    if taken.is_expired_at(now) {
        warn!(
            identifier = %safe_email_log(&taken.identifier),
            purpose = purpose.as_str(),
            expired_at = %taken.expires_at,
            "Expired token presented and removed"
        );
        return Err(ApiError::ExpiredToken);
    }

    debug!(identifier = %safe_email_log(&taken.identifier), purpose = purpose.as_str(), "Token consumed");
    Ok(taken)
}

/// Periodically delete expired tokens that were never presented
pub fn spawn_expired_token_sweeper(pool: SqlitePool, every: Duration) -> JoinHandle<()> {
    // tokio panics on a zero period
    let every = every.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match repo::purge_expired(&pool, Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Expired verification tokens swept"),
                Err(e) => error!(error = %e, "Expired token sweep failed"),
            }
        }
    })
}
