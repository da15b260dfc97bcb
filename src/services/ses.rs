// src/services/ses.rs
//! AWS SES v2 delivery

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::config::{Credentials, Region};
use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use tracing::{error, info};

use super::email::{EmailError, EmailMessage, EmailSender};
use crate::common::config::ConfigError;
use crate::common::safe_email_log;

#[derive(Clone)]
pub struct SesConfig {
    pub region: String,
    pub from_email: String,
    /// Static credentials; when absent the default AWS provider chain is used
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl std::fmt::Debug for SesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SesConfig")
            .field("region", &self.region)
            .field("from_email", &self.from_email)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SesConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            region: lookup("AWS_SES_REGION").ok_or(ConfigError::Missing("AWS_SES_REGION"))?,
            from_email: lookup("AWS_SES_FROM_EMAIL")
                .ok_or(ConfigError::Missing("AWS_SES_FROM_EMAIL"))?,
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
        })
    }
}

pub struct SesMailer {
    client: SesClient,
    from_email: String,
}

impl SesMailer {
    pub async fn new(config: &SesConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "environment",
            ));
        }

        let aws_config = loader.load().await;
        info!(region = %config.region, "SES transport configured");

        Self {
            client: SesClient::new(&aws_config),
            from_email: config.from_email.clone(),
        }
    }
}

fn utf8_content(data: &str, part: &str) -> Result<Content, EmailError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| EmailError::Build(format!("Failed to build {part}: {e}")))
}

#[async_trait]
impl EmailSender for SesMailer {
    fn transport_name(&self) -> &'static str {
        "ses"
    }

    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let destination = Destination::builder()
            .to_addresses(message.to.clone())
            .build();

        let ses_body = SesBody::builder()
            .html(utf8_content(&message.html, "html body")?)
            .text(utf8_content(&message.text, "text body")?)
            .build();

        let ses_message = Message::builder()
            .subject(utf8_content(&message.subject, "subject")?)
            .body(ses_body)
            .build();

        let email_content = EmailContent::builder().simple(ses_message).build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from_email)
            .destination(destination)
            .content(email_content)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, to = %safe_email_log(&message.to), "Failed to send email via SES");
                EmailError::Transport(format!("SES send failed: {e}"))
            })?;

        info!(
            to = %safe_email_log(&message.to),
            message_id = ?result.message_id(),
            "Email sent successfully via SES"
        );

        Ok(())
    }
}
