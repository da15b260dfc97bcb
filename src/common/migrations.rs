// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Create the schema, optionally dropping existing tables first
///
/// Tables are created with `IF NOT EXISTS`, so running this on every start
/// is safe. `reset` (from `RESET_DB=true`) discards all data.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_user_tables(pool).await?;
    create_token_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Drop tables in reverse dependency order
    let tables = ["verification_tokens", "accounts", "users"];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Users table; password_hash is NULL for OAuth-only accounts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT,
            email_verified_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Federated identities linked to a local user
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            provider TEXT NOT NULL,
            provider_account_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(provider, provider_account_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_token_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Single-use email verification and password reset tokens
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verification_tokens (
            token TEXT PRIMARY KEY,
            identifier TEXT NOT NULL,
            purpose TEXT NOT NULL CHECK (purpose IN ('email_verification', 'password_reset')),
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_verification_tokens_identifier ON verification_tokens(identifier, purpose)",
        "CREATE INDEX IF NOT EXISTS idx_verification_tokens_expires_at ON verification_tokens(expires_at)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::setup_test_db;
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = setup_test_db().await;
        run_migrations(&pool, false).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["accounts", "users", "verification_tokens"]);
    }

    #[tokio::test]
    async fn test_reset_drops_data() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO users (id, name, email) VALUES ('U_1', 'Rahim', 'r@example.com')")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool, true).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unknown_token_purpose_rejected() {
        let pool = setup_test_db().await;
        let result = sqlx::query(
            "INSERT INTO verification_tokens (token, identifier, purpose, expires_at) VALUES ('t', 'a@b.co', 'magic_link', '2030-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
