//! Tests for verification module
//!
//! Token lifecycle (issue, consume once, expiry, re-issue) and the email
//! verification and password reset flows through the router.

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::StatusCode;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};

    use crate::common::migrations::test_support::setup_test_db;
    use crate::common::state::test_support::{TestApp, TEST_APP_URL};
    use crate::common::ApiError;
    use crate::users::repo as users_repo;
    use crate::verification::handlers::{ALREADY_VERIFIED_MESSAGE, RESET_REQUESTED_MESSAGE};
    use crate::verification::models::TokenPurpose;
    use crate::verification::service::{
        consume_token, consume_token_at, issue_token, issue_token_at,
    };

    const EMAIL: &str = "sumaiya@example.com";
    const PASSWORD: &str = "first password";

    async fn register(app: &TestApp) -> String {
        let (status, _, body) = app
            .post_json(
                "/api/register",
                json!({ "name": "Sumaiya", "email": EMAIL, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["user"]["id"].as_str().unwrap().to_string()
    }

    async fn sign_in(app: &TestApp, password: &str) -> StatusCode {
        let (status, _, _) = app
            .post_json(
                "/api/auth/callback/credentials",
                json!({ "email": EMAIL, "password": password }),
            )
            .await;
        status
    }

    #[tokio::test]
    async fn test_token_is_accepted_exactly_once() {
        let pool = setup_test_db().await;
        let issued = issue_token(&pool, EMAIL, TokenPurpose::EmailVerification)
            .await
            .unwrap();
        assert_eq!(issued.token.len(), 64);

        let consumed = consume_token(&pool, &issued.token, TokenPurpose::EmailVerification)
            .await
            .unwrap();
        assert_eq!(consumed.identifier, EMAIL);

        let replay = consume_token(&pool, &issued.token, TokenPurpose::EmailVerification).await;
        assert!(matches!(replay, Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_and_removed() {
        let pool = setup_test_db().await;
        let issued_at = Utc::now() - Duration::hours(25);
        let issued = issue_token_at(&pool, EMAIL, TokenPurpose::EmailVerification, issued_at)
            .await
            .unwrap();

        let result = consume_token(&pool, &issued.token, TokenPurpose::EmailVerification).await;
        assert!(matches!(result, Err(ApiError::ExpiredToken)));

        assert!(repo::find_token(&pool, &issued.token).await.unwrap().is_none());
        let again = consume_token(&pool, &issued.token, TokenPurpose::EmailVerification).await;
        assert!(matches!(again, Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_token_ttls() {
        let pool = setup_test_db().await;
        let now = Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap();

        let reset = issue_token_at(&pool, EMAIL, TokenPurpose::PasswordReset, now)
            .await
            .unwrap();
        assert_eq!(reset.expires_at, now + Duration::hours(1));

        // Still valid right at the boundary, expired just after
        assert!(consume_token_at(&pool, &reset.token, TokenPurpose::PasswordReset, reset.expires_at)
            .await
            .is_ok());

        let verify = issue_token_at(&pool, EMAIL, TokenPurpose::EmailVerification, now)
            .await
            .unwrap();
        assert_eq!(verify.expires_at, now + Duration::hours(24));
        let late = verify.expires_at + Duration::seconds(1);
        assert!(matches!(
            consume_token_at(&pool, &verify.token, TokenPurpose::EmailVerification, late).await,
            Err(ApiError::ExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_token() {
        let pool = setup_test_db().await;
        let first = issue_token(&pool, EMAIL, TokenPurpose::PasswordReset).await.unwrap();
        let second = issue_token(&pool, EMAIL, TokenPurpose::PasswordReset).await.unwrap();
        assert_ne!(first.token, second.token);

        assert!(matches!(
            consume_token(&pool, &first.token, TokenPurpose::PasswordReset).await,
            Err(ApiError::InvalidToken)
        ));
        assert!(consume_token(&pool, &second.token, TokenPurpose::PasswordReset)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_tokens_are_scoped_by_purpose() {
        let pool = setup_test_db().await;
        let verify = issue_token(&pool, EMAIL, TokenPurpose::EmailVerification)
            .await
            .unwrap();
        let reset = issue_token(&pool, EMAIL, TokenPurpose::PasswordReset).await.unwrap();

        // Issuing a reset token leaves the verification token alone
        assert!(repo::find_token(&pool, &verify.token).await.unwrap().is_some());

        assert!(matches!(
            consume_token(&pool, &verify.token, TokenPurpose::PasswordReset).await,
            Err(ApiError::InvalidToken)
        ));
        assert!(consume_token(&pool, &verify.token, TokenPurpose::EmailVerification)
            .await
            .is_ok());
        assert!(consume_token(&pool, &reset.token, TokenPurpose::PasswordReset)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_tokens() {
        let pool = setup_test_db().await;
        let stale = issue_token_at(
            &pool,
            "old@example.com",
            TokenPurpose::PasswordReset,
            Utc::now() - Duration::hours(2),
        )
        .await
        .unwrap();
        let live = issue_token(&pool, EMAIL, TokenPurpose::PasswordReset).await.unwrap();

        assert_eq!(repo::purge_expired(&pool, Utc::now()).await.unwrap(), 1);
        assert!(repo::find_token(&pool, &stale.token).await.unwrap().is_none());
        assert!(repo::find_token(&pool, &live.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_survives_zero_interval() {
        let pool = setup_test_db().await;
        let stale = issue_token_at(
            &pool,
            "old@example.com",
            TokenPurpose::EmailVerification,
            Utc::now() - Duration::days(2),
        )
        .await
        .unwrap();

        let handle = spawn_expired_token_sweeper(pool.clone(), std::time::Duration::ZERO);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert!(!handle.is_finished());
        assert!(repo::find_token(&pool, &stale.token).await.unwrap().is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn test_email_verification_flow() {
        let app = TestApp::new().await;
        let user_id = register(&app).await;

        let (status, _, body) = app
            .post_json("/api/send-verification", json!({ "userId": user_id, "email": EMAIL }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, EMAIL);
        assert!(sent[0]
            .text
            .contains(&format!("{TEST_APP_URL}/verify-email?token=")));

        let token = app.mailer.last_token().unwrap();
        let (status, _, body) = app.post_json("/api/verify-email", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let user = users_repo::find_user_by_id(&app.state.db, &user_id)
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_verified());

        let (status, _, body) = app.post_json("/api/verify-email", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_expired_verification_token_over_http() {
        let app = TestApp::new().await;
        register(&app).await;
        let issued = issue_token_at(
            &app.state.db,
            EMAIL,
            TokenPurpose::EmailVerification,
            Utc::now() - Duration::days(2),
        )
        .await
        .unwrap();

        let (status, _, body) = app
            .post_json("/api/verify-email", json!({ "token": issued.token }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_send_verification_rejects_foreign_address_and_unknown_user() {
        let app = TestApp::new().await;
        let user_id = register(&app).await;

        let (status, _, _) = app
            .post_json(
                "/api/send-verification",
                json!({ "userId": user_id, "email": "attacker@example.com" }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = app
            .post_json(
                "/api/send-verification",
                json!({ "userId": "U_NOBODY0000", "email": EMAIL }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_verification_email_does_not_render_markup_from_name() {
        let app = TestApp::new().await;
        let (status, _, body) = app
            .post_json(
                "/api/register",
                json!({
                    "name": r#"<a href="https://evil.example">Claim prize</a>"#,
                    "email": EMAIL,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = body["user"]["id"].as_str().unwrap();

        let (status, _, _) = app
            .post_json("/api/send-verification", json!({ "userId": user_id, "email": EMAIL }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].html.contains("<a href=\"https://evil.example\">"));
        assert!(sent[0].html.contains("&lt;a href="));
    }

    #[tokio::test]
    async fn test_send_verification_for_verified_user_sends_nothing() {
        let app = TestApp::new().await;
        let user_id = register(&app).await;
        users_repo::mark_email_verified(&app.state.db, &user_id, Utc::now())
            .await
            .unwrap();

        let (status, _, body) = app
            .post_json("/api/send-verification", json!({ "userId": user_id, "email": EMAIL }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], ALREADY_VERIFIED_MESSAGE);
        assert!(app.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_verification_delivery_failure_is_reported() {
        let app = TestApp::new().await;
        let user_id = register(&app).await;
        app.mailer.set_failing(true);

        let (status, _, body) = app
            .post_json("/api/send-verification", json!({ "userId": user_id, "email": EMAIL }))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_reset_request_does_not_reveal_registration() {
        let app = TestApp::new().await;
        register(&app).await;

        let known: (StatusCode, Value) = {
            let (status, _, body) = app.post_json("/api/reset-password", json!({ "email": EMAIL })).await;
            (status, body)
        };
        let unknown: (StatusCode, Value) = {
            let (status, _, body) = app
                .post_json("/api/reset-password", json!({ "email": "stranger@example.com" }))
                .await;
            (status, body)
        };

        assert_eq!(known, unknown);
        assert_eq!(known.0, StatusCode::OK);
        assert_eq!(known.1["message"], RESET_REQUESTED_MESSAGE);
        assert_eq!(app.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_request_hides_delivery_failure() {
        let app = TestApp::new().await;
        register(&app).await;
        app.mailer.set_failing(true);

        let (status, _, body) = app.post_json("/api/reset-password", json!({ "email": EMAIL })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], RESET_REQUESTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let app = TestApp::new().await;
        register(&app).await;

        app.post_json("/api/reset-password", json!({ "email": EMAIL })).await;
        let sent = app.mailer.sent();
        assert!(sent[0]
            .text
            .contains(&format!("{TEST_APP_URL}/reset-password?token=")));
        let token = app.mailer.last_token().unwrap();

        let (status, _, body) = app
            .post_json(
                "/api/reset-password/confirm",
                json!({ "token": token, "password": "second password" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        assert_eq!(sign_in(&app, "second password").await, StatusCode::OK);
        assert_eq!(sign_in(&app, PASSWORD).await, StatusCode::UNAUTHORIZED);

        let (status, _, body) = app
            .post_json(
                "/api/reset-password/confirm",
                json!({ "token": token, "password": "third password" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_rejected_new_password_keeps_token_usable() {
        let app = TestApp::new().await;
        register(&app).await;
        app.post_json("/api/reset-password", json!({ "email": EMAIL })).await;
        let token = app.mailer.last_token().unwrap();

        let (status, _, body) = app
            .post_json("/api/reset-password/confirm", json!({ "token": token, "password": "short" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        assert!(repo::find_token(&app.state.db, &token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verification_token_cannot_reset_password() {
        let app = TestApp::new().await;
        register(&app).await;
        let issued = issue_token(&app.state.db, EMAIL, TokenPurpose::EmailVerification)
            .await
            .unwrap();

        let (status, _, body) = app
            .post_json(
                "/api/reset-password/confirm",
                json!({ "token": issued.token, "password": "second password" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TOKEN");
        assert_eq!(sign_in(&app, PASSWORD).await, StatusCode::OK);
    }
}
