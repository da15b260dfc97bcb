//! Verification token models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What a token authorizes; tokens of one purpose never satisfy the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// Lifetime of a freshly issued token
    pub fn ttl(&self) -> Duration {
        match self {
            TokenPurpose::EmailVerification => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::hours(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Single-use bearer token bound to an email address
#[derive(FromRow, Debug, Clone)]
pub struct VerificationToken {
    /// Email the token was issued for
    pub identifier: String,
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ConfirmResetRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// Success envelope shared by the verification endpoints
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }
}
