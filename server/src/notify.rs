//! SMTP delivery of reservation emails using Lettre.

use crate::config::{EmailConfig, SmtpConfig};
use async_trait::async_trait;
use equipment_booking_core::notifier::{ConsoleNotifier, EmailMessage, Notifier, NotifyError};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Arc;

/// Notifier that relays messages through an SMTP server.
///
/// Each message carries a plain-text and an HTML alternative.
#[derive(Clone)]
pub struct SmtpNotifier {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidAddress`] if the sender cannot be parsed.
    pub fn new(smtp: &SmtpConfig, from_address: &str, from_name: &str) -> Result<Self, NotifyError> {
        let from = format!("{from_name} <{from_address}>")
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("{from_address}: {e}")))?;
        Ok(Self {
            smtp_server: smtp.host.clone(),
            smtp_port: smtp.port,
            credentials: Credentials::new(smtp.username.clone(), smtp.password.clone()),
            from,
        })
    }

    /// Build SMTP transport for sending emails.
    fn build_transport(&self) -> Result<SmtpTransport, NotifyError> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    /// Assembles the MIME message.
    fn build_message(&self, message: &EmailMessage) -> Result<Message, NotifyError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("{}: {e}", message.to)))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let email = self.build_message(&message)?;
        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotifyError::Transport(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| NotifyError::Transport(format!("Email task failed: {e}")))?
        .map(|_| ())?;

        tracing::debug!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Picks SMTP delivery when a relay is configured, console logging otherwise.
///
/// # Errors
///
/// Returns [`NotifyError::InvalidAddress`] if the configured sender is invalid.
pub fn notifier_from_config(email: &EmailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &email.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP notifier");
            Ok(Arc::new(SmtpNotifier::new(
                smtp,
                &email.from_address,
                &email.from_name,
            )?))
        },
        None => {
            tracing::info!("SMTP_HOST not set, emails will be logged only");
            Ok(Arc::new(ConsoleNotifier::new()))
        },
    }
}
