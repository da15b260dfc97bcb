// src/services/email.rs
//! Transactional email
//!
//! Handlers depend only on `EmailSender`. The concrete transport is chosen
//! once at startup from configuration:
//!
//! - `smtp`: lettre over STARTTLS (implicit TLS on port 465)
//! - `ses`: AWS SES v2
//! - `console`: the message is written to the log instead of being sent.
//!   This is a development mode and is announced with a warning at startup.
//!
//! Without `EMAIL_TRANSPORT`, SMTP is used when every `SMTP_*` variable is
//! set and console mode otherwise.

use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::ses::{SesConfig, SesMailer};
use super::smtp::{SmtpConfig, SmtpMailer};
use crate::common::config::{env_opt, ConfigError};
use crate::common::safe_email_log;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("email transport failed: {0}")]
    Transport(String),
}

/// A rendered email ready to send
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Short transport name for logs
    fn transport_name(&self) -> &'static str;

    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Transport selected by configuration
#[derive(Debug, Clone)]
pub enum EmailTransport {
    Smtp(SmtpConfig),
    Ses(SesConfig),
    Console,
}

impl EmailTransport {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup("EMAIL_TRANSPORT").map(|v| v.to_lowercase()).as_deref() {
            Some("smtp") => Ok(Self::Smtp(SmtpConfig::from_lookup(&lookup)?)),
            Some("ses") => Ok(Self::Ses(SesConfig::from_lookup(&lookup)?)),
            Some("console") => Ok(Self::Console),
            Some(other) => Err(ConfigError::Invalid {
                var: "EMAIL_TRANSPORT",
                reason: format!("unknown transport '{other}' (expected smtp, ses or console)"),
            }),
            None if SmtpConfig::is_complete(&lookup) => Ok(Self::Smtp(SmtpConfig::from_lookup(&lookup)?)),
            None => Ok(Self::Console),
        }
    }
}

/// Build the sender for a transport
pub async fn build_sender(transport: &EmailTransport) -> Result<Arc<dyn EmailSender>, EmailError> {
    let sender: Arc<dyn EmailSender> = match transport {
        EmailTransport::Smtp(config) => Arc::new(SmtpMailer::new(config)?),
        EmailTransport::Ses(config) => Arc::new(SesMailer::new(config).await),
        EmailTransport::Console => {
            warn!("📧 Email transport: console. Emails are logged, not delivered. Set SMTP_* or EMAIL_TRANSPORT for delivery.");
            Arc::new(ConsoleMailer)
        }
    };
    info!(transport = sender.transport_name(), "Email sender initialized");
    Ok(sender)
}

/// Logs messages instead of delivering them
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl EmailSender for ConsoleMailer {
    fn transport_name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %safe_email_log(&message.to),
            subject = %message.subject,
            body = %message.text,
            "📧 Email (console transport, not delivered)"
        );
        Ok(())
    }
}

// ---- Templates ----

/// Every argument is escaped; `lines_*` may carry user-supplied names
fn render_html(heading: &str, lines_en: &str, lines_bn: &str, link: &str, button: &str) -> String {
    let heading = encode_text(heading);
    let lines_en = encode_text(lines_en);
    let lines_bn = encode_text(lines_bn);
    let href = encode_double_quoted_attribute(link);
    let link = encode_text(link);
    let button = encode_text(button);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, 'Noto Sans Bengali', sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #4F46E5; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{heading}</h1>
        </div>
        <div class="content">
            <p>{lines_en}</p>
            <p lang="bn">{lines_bn}</p>
            <p><a class="button" href="{href}">{button}</a></p>
            <p>{link}</p>
        </div>
        <div class="footer">
            <p>If you did not request this, you can ignore this email. / আপনি এটি অনুরোধ না করে থাকলে এই ইমেইলটি উপেক্ষা করুন।</p>
        </div>
    </div>
</body>
</html>"#
    )
}

/// Email carrying the link that confirms an address
pub fn verification_email(to: &str, name: &str, link: &str) -> EmailMessage {
    let en = format!(
        "Hi {name}, please confirm your email address. The link is valid for 24 hours."
    );
    let bn = format!(
        "প্রিয় {name}, অনুগ্রহ করে আপনার ইমেইল ঠিকানা যাচাই করুন। লিংকটি ২৪ ঘণ্টা কার্যকর থাকবে।"
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your email / আপনার ইমেইল যাচাই করুন".to_string(),
        html: render_html(
            "Verify your email / ইমেইল যাচাই",
            &en,
            &bn,
            link,
            "Verify email / যাচাই করুন",
        ),
        text: format!("{en}\n{bn}\n\n{link}\n"),
    }
}

/// Email carrying the link that authorizes a password change
pub fn password_reset_email(to: &str, link: &str) -> EmailMessage {
    let en = "We received a request to reset your password. The link is valid for 1 hour.";
    let bn = "আপনার পাসওয়ার্ড রিসেট করার একটি অনুরোধ পেয়েছি। লিংকটি ১ ঘণ্টা কার্যকর থাকবে।";
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password / পাসওয়ার্ড রিসেট করুন".to_string(),
        html: render_html(
            "Reset your password / পাসওয়ার্ড রিসেট",
            en,
            bn,
            link,
            "Reset password / রিসেট করুন",
        ),
        text: format!("{en}\n{bn}\n\n{link}\n"),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_verification_email_contains_link_in_both_bodies() {
        let link = "http://localhost:3000/verify-email?token=abc123";
        let message = verification_email("rahim@example.com", "Rahim", link);

        assert_eq!(message.to, "rahim@example.com");
        assert!(message.text.contains(link));
        assert!(message.html.contains(link));
        assert!(message.text.contains("Rahim"));
        assert!(message.subject.contains("যাচাই"));
    }

    #[test]
    fn test_password_reset_email() {
        let link = "http://localhost:3000/reset-password?token=def456";
        let message = password_reset_email("karim@example.com", link);
        assert!(message.text.contains(link));
        assert!(message.text.contains("1 hour"));
    }

    #[test]
    fn test_verification_email_escapes_name_in_html() {
        let name = r#"<a href="https://evil.example">Claim prize</a>"#;
        let link = "http://localhost:3000/verify-email?token=abc123&lang=bn";
        let message = verification_email("rahim@example.com", name, link);

        assert!(!message.html.contains("<a href=\"https://evil.example\">"));
        assert!(message.html.contains("&lt;a href="));
        assert!(message.html.contains("Claim prize&lt;/a&gt;"));
        assert!(message.html.contains(r#"href="http://localhost:3000/verify-email?token=abc123&amp;lang=bn""#));

        // Plain text is not markup and keeps the name as typed
        assert!(message.text.contains(name));
        assert!(message.text.contains(link));
    }

    #[tokio::test]
    async fn test_console_mailer_never_fails() {
        let message = password_reset_email("karim@example.com", "http://x/reset?token=1");
        assert!(ConsoleMailer.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_mailer_extracts_token() {
        let mailer = RecordingMailer::default();
        mailer
            .send(verification_email(
                "a@example.com",
                "A",
                "http://localhost:3000/verify-email?token=0a1b2c",
            ))
            .await
            .unwrap();
        assert_eq!(mailer.last_token().as_deref(), Some("0a1b2c"));

        mailer.set_failing(true);
        let result = mailer
            .send(password_reset_email("a@example.com", "http://x"))
            .await;
        assert!(matches!(result, Err(EmailError::Transport(_))));
        assert_eq!(mailer.sent().len(), 1);
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SMTP_ENV: [(&str, &str); 5] = [
        ("SMTP_HOST", "smtp.example.com"),
        ("SMTP_PORT", "587"),
        ("SMTP_USER", "mailer"),
        ("SMTP_PASSWORD", "s3cret"),
        ("SMTP_FROM", "no-reply@example.com"),
    ];

    #[test]
    fn test_transport_defaults_to_console_without_smtp() {
        let transport = EmailTransport::from_lookup(lookup(&[]));
        assert!(matches!(transport, Ok(EmailTransport::Console)));

        // Partial SMTP settings are not enough to pick SMTP implicitly
        let transport = EmailTransport::from_lookup(lookup(&SMTP_ENV[..4]));
        assert!(matches!(transport, Ok(EmailTransport::Console)));
    }

    #[test]
    fn test_transport_selection() {
        let transport = EmailTransport::from_lookup(lookup(&SMTP_ENV));
        assert!(matches!(transport, Ok(EmailTransport::Smtp(c)) if c.port == 587));

        let transport = EmailTransport::from_lookup(lookup(&[
            ("EMAIL_TRANSPORT", "SES"),
            ("AWS_SES_REGION", "ap-south-1"),
            ("AWS_SES_FROM_EMAIL", "no-reply@example.com"),
        ]));
        assert!(matches!(transport, Ok(EmailTransport::Ses(c)) if c.region == "ap-south-1"));

        let transport = EmailTransport::from_lookup(lookup(&[("EMAIL_TRANSPORT", "ses")]));
        assert!(matches!(transport, Err(ConfigError::Missing("AWS_SES_REGION"))));

        let transport = EmailTransport::from_lookup(lookup(&[("EMAIL_TRANSPORT", "pigeon")]));
        assert!(matches!(transport, Err(ConfigError::Invalid { var: "EMAIL_TRANSPORT", .. })));

        let transport =
            EmailTransport::from_lookup(lookup(&[("EMAIL_TRANSPORT", "console"), SMTP_ENV[0]]));
        assert!(matches!(transport, Ok(EmailTransport::Console)));
    }
}
