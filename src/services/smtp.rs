// src/services/smtp.rs
//! SMTP delivery through lettre

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use super::email::{EmailError, EmailMessage, EmailSender};
use crate::common::config::ConfigError;
use crate::common::safe_email_log;

/// Port on which the server expects TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;

const SMTP_VARS: [&str; 5] = ["SMTP_HOST", "SMTP_PORT", "SMTP_USER", "SMTP_PASSWORD", "SMTP_FROM"];

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Sender mailbox, e.g. `Chat <no-reply@example.com>`
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpConfig {
    /// True when every `SMTP_*` variable has a value
    pub fn is_complete(lookup: impl Fn(&str) -> Option<String>) -> bool {
        SMTP_VARS.iter().all(|var| lookup(var).is_some())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let raw_port = require("SMTP_PORT")?;
        let port = raw_port.parse::<u16>().map_err(|_| ConfigError::Invalid {
            var: "SMTP_PORT",
            reason: format!("'{raw_port}' is not a port number"),
        })?;

        Ok(Self {
            host: require("SMTP_HOST")?,
            port,
            user: require("SMTP_USER")?,
            password: require("SMTP_PASSWORD")?,
            from: require("SMTP_FROM")?,
        })
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| EmailError::InvalidAddress {
            address: safe_email_log(address),
            reason: e.to_string(),
        })
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let from = parse_mailbox(&config.from)?;

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| EmailError::Transport(format!("SMTP relay setup failed: {e}")))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();

        info!(host = %config.host, port = config.port, "SMTP transport configured");

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    fn transport_name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let to = parse_mailbox(&message.to)?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .multipart(MultiPart::alternative_plain_html(message.text, message.html))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(email).await.map_err(|e| {
            error!(error = %e, to = %safe_email_log(&message.to), "Failed to send email via SMTP");
            EmailError::Transport(e.to_string())
        })?;

        info!(to = %safe_email_log(&message.to), "Email sent successfully via SMTP");
        Ok(())
    }
}
