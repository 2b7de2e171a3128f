//! Outbound transactional email.
//!
//! Handlers talk to a [`Mailer`]; production wires in [`SmtpMailer`], which
//! relays through an authenticated SMTP submission server.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Port that speaks TLS from the first byte instead of upgrading via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Email errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email service is not configured")]
    NotConfigured,

    #[error("Invalid email address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Failed to send email: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A composed plain-text message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Mailbox,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// Build a project notification.
    pub fn project_notification(
        to_email: &str,
        subject: &str,
        project_name: &str,
        message: &str,
    ) -> Result<Self, MailError> {
        Ok(Self {
            to: parse_mailbox(to_email)?,
            subject: subject.to_string(),
            body: notification_body(project_name, message),
        })
    }
}

/// Delivery seam for outgoing mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP relay with username/password authentication.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.address)?;

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.address.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.clone())
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;

        let response = self.transport.send(message).await?;
        tracing::info!(
            to = %email.to,
            code = %response.code(),
            "Email relayed"
        );
        Ok(())
    }
}

/// Plain-text body used for project notifications.
pub fn notification_body(project_name: &str, message: &str) -> String {
    format!(
        "Project: {}\n\n{}\n\n---\nSent from Research Dashboard\n",
        project_name, message
    )
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
