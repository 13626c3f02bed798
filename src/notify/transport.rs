//! Report delivery over SMTP.
//!
//! The aggregator only sees the [`ReportTransport`] trait; [`SmtpMailer`]
//! is the production implementation built from the `[mail]` config section.

use crate::config::MailConfig;
use crate::error::DeliveryError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Port on which SMTP servers expect implicit TLS instead of STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Delivers an HTML document to the configured recipients.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Send one message. Completes once the server accepted or refused it.
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: ReportTransport + ?Sized> ReportTransport for std::sync::Arc<T> {
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        (**self).send(subject, html_body).await
    }
}

/// SMTP-backed transport.
pub struct SmtpMailer {
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a mailer, parsing every address up front.
    pub fn new(config: &MailConfig) -> Result<Self, DeliveryError> {
        let sender: Mailbox = config.sender.parse()?;
        let recipients = config
            .to
            .iter()
            .map(|address| address.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;

        let builder = if config.smtp_port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_passphrase.clone(),
            ))
            .build();

        Ok(Self {
            sender,
            recipients,
            transport,
        })
    }

    fn build_message(&self, subject: &str, html_body: &str) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);

        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        Ok(builder.body(html_body.to_string())?)
    }
}

#[async_trait]
impl ReportTransport for SmtpMailer {
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(subject, html_body)?;

        debug!(
            "Sending '{}' to {} recipient(s)",
            subject,
            self.recipients.len()
        );

        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(DeliveryError::Rejected(response.code().to_string()));
        }

        Ok(())
    }
}
