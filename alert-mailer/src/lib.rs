//! E-mail alert dispatcher.
//!
//! Each alert becomes one plain-text message sent over SMTP with STARTTLS to
//! every configured recipient.

pub mod format;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use monitor_core::{truncate_chars, Alert, AlertDispatcher, CoreError, DeliveryError, EmailConfig};
use std::time::Duration;
use tracing::{debug, info};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EmailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    server: String,
}

impl EmailDispatcher {
    pub fn new(config: &EmailConfig) -> Result<Self, CoreError> {
        let from = parse_mailbox(&config.from)?;
        let recipients = config
            .to
            .iter()
            .map(String::as_str)
            .map(parse_mailbox)
            .collect::<Result<Vec<_>, _>>()?;

        if recipients.is_empty() {
            return Err(DeliveryError::InvalidAddress {
                address: String::new(),
                reason: "no recipients configured".to_string(),
            }
            .into());
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| DeliveryError::ConnectionFailed {
                server: config.smtp_server.clone(),
                reason: e.to_string(),
            })?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.from.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            recipients,
            server: format!("{}:{}", config.smtp_server, config.smtp_port),
        })
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.recipients
    }

    pub fn build_message(&self, alert: &Alert) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format::subject(alert))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .body(format::body(alert))
            .map_err(|e| DeliveryError::MessageBuild {
                reason: e.to_string(),
            })
    }

    fn classify(&self, error: lettre::transport::smtp::Error) -> DeliveryError {
        if error.is_permanent() {
            DeliveryError::Rejected {
                reason: error.to_string(),
            }
        } else if error.is_transient() || error.is_timeout() {
            DeliveryError::Transport {
                reason: error.to_string(),
            }
        } else {
            DeliveryError::ConnectionFailed {
                server: self.server.clone(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl AlertDispatcher for EmailDispatcher {
    async fn send(&self, alert: &Alert) -> Result<(), CoreError> {
        let message = self.build_message(alert)?;
        debug!(
            "Sending alert e-mail via {} to {} recipients",
            self.server,
            self.recipients.len()
        );

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| self.classify(e))?;

        info!(
            "Email alert sent for post: {} ({})",
            truncate_chars(&alert.title, 50),
            response.code()
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config(to: &[&str]) -> EmailConfig {
        let recipients = to
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(", ");
        toml::from_str(&format!(
            r#"
            smtp_server = "smtp.example.com"
            from = "alerts@example.com"
            password = "pw"
            to = [{}]
            "#,
            recipients
        ))
        .unwrap()
    }

    fn sample_alert() -> Alert {
        Alert {
            channel: "caregivers".to_string(),
            title: "Assisted living recommendations?".to_string(),
            author: "someone".to_string(),
            url: "https://reddit.com/r/caregivers/comments/x1/".to_string(),
            created: "2024-01-01 09:30:00".to_string(),
            excerpt: "We are in Tucson".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_creation() {
        let dispatcher =
            EmailDispatcher::new(&email_config(&["team@example.com", "lead@example.com"]))
                .unwrap();
        assert_eq!(dispatcher.recipients().len(), 2);
        assert_eq!(dispatcher.server, "smtp.example.com:587");
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let result = EmailDispatcher::new(&email_config(&["not-an-address"]));
        assert!(matches!(
            result,
            Err(CoreError::Delivery(DeliveryError::InvalidAddress { .. }))
        ));
    }

    #[tokio::test]
    async fn test_no_recipients_rejected() {
        assert!(EmailDispatcher::new(&email_config(&[])).is_err());
    }

    #[tokio::test]
    async fn test_build_message_headers_and_body() {
        let dispatcher =
            EmailDispatcher::new(&email_config(&["team@example.com", "lead@example.com"]))
                .unwrap();
        let message = dispatcher.build_message(&sample_alert()).unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);
        assert_eq!(
            envelope.from().map(|a| a.to_string()),
            Some("alerts@example.com".to_string())
        );

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Reddit Alert: caregivers"));
        assert!(raw.contains("Subreddit: r/caregivers"));
    }
}
