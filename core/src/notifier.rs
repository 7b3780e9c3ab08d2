//! Notifier: reservation status emails.
//!
//! The admission controller awaits each send but never fails because of
//! one; see [`AdmissionController`](crate::admission::AdmissionController).
//!
//! Message copy is in French, like the rest of the product's user-facing
//! labels.

use crate::identity::UserContact;
use crate::types::{Equipment, Reservation, ReservationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

/// Notification delivery errors.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Sender or recipient address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The transport refused or failed to deliver.
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// A fully rendered email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// HTML body
    pub html: String,
}

/// Reservation facts shown in every template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationDetails {
    /// Equipment display name
    pub equipment_name: String,
    /// Formatted start instant
    pub start_date: String,
    /// Formatted end instant
    pub end_date: String,
    /// Quantity booked
    pub quantity: u32,
    /// Optional purpose
    pub description: Option<String>,
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%d/%m/%Y %H:%M UTC").to_string()
}

impl ReservationDetails {
    /// Extracts the template details of `reservation`.
    #[must_use]
    pub fn new(equipment: &Equipment, reservation: &Reservation) -> Self {
        Self {
            equipment_name: equipment.name.clone(),
            start_date: format_instant(reservation.window.start()),
            end_date: format_instant(reservation.window.end()),
            quantity: reservation.quantity,
            description: reservation.description.clone(),
        }
    }
}

/// Which template to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// Request received, awaiting a decision
    Pending,
    /// Request accepted
    Approved,
    /// Request declined
    Rejected {
        /// Optional explanation
        reason: Option<String>,
    },
}

impl NotificationKind {
    /// Template matching a reservation's status.
    #[must_use]
    pub fn for_reservation(reservation: &Reservation) -> Self {
        match reservation.status {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Approved => Self::Approved,
            ReservationStatus::Rejected => Self::Rejected {
                reason: reservation.rejection_reason.clone(),
            },
        }
    }

    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Outgoing email channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one rendered message.
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError>;

    /// "Request received" email.
    async fn send_pending(
        &self,
        to: &UserContact,
        details: &ReservationDetails,
    ) -> Result<(), NotifyError> {
        self.send(templates::pending(to, details)).await
    }

    /// "Request approved" email.
    async fn send_approved(
        &self,
        to: &UserContact,
        details: &ReservationDetails,
    ) -> Result<(), NotifyError> {
        self.send(templates::approved(to, details)).await
    }

    /// "Request rejected" email.
    async fn send_rejected(
        &self,
        to: &UserContact,
        details: &ReservationDetails,
        reason: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.send(templates::rejected(to, details, reason)).await
    }

    /// Dispatches on `kind`.
    async fn notify(
        &self,
        kind: &NotificationKind,
        to: &UserContact,
        details: &ReservationDetails,
    ) -> Result<(), NotifyError> {
        match kind {
            NotificationKind::Pending => self.send_pending(to, details).await,
            NotificationKind::Approved => self.send_approved(to, details).await,
            NotificationKind::Rejected { reason } => {
                self.send_rejected(to, details, reason.as_deref()).await
            },
        }
    }
}

/// Notifier that only logs messages. Used in development.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Email (console mode)"
        );
        Ok(())
    }
}

/// Message templates.
pub mod templates {
    use super::{EmailMessage, ReservationDetails};
    use crate::identity::UserContact;

    /// Fallback shown when a rejection carries no reason.
    pub const UNSPECIFIED_REASON: &str = "Non spécifiée";

    fn escape(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

    fn details_table(details: &ReservationDetails, with_description: bool) -> String {
        let mut rows = format!(
            "<tr><td><strong>Équipement:</strong></td><td>{}</td></tr>\
             <tr><td><strong>Date de début:</strong></td><td>{}</td></tr>\
             <tr><td><strong>Date de fin:</strong></td><td>{}</td></tr>\
             <tr><td><strong>Quantité:</strong></td><td>{}</td></tr>",
            escape(&details.equipment_name),
            escape(&details.start_date),
            escape(&details.end_date),
            details.quantity,
        );
        if with_description {
            if let Some(description) = details.description.as_deref().filter(|d| !d.is_empty()) {
                rows.push_str(&format!(
                    "<tr><td><strong>Description:</strong></td><td>{}</td></tr>",
                    escape(description)
                ));
            }
        }
        format!(r#"<table style="width: 100%; line-height: 2;">{rows}</table>"#)
    }

    fn layout(color: &str, title: &str, greeting_name: &str, body: &str) -> String {
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 10px;">
<h2 style="color: {color}; text-align: center;">{title}</h2>
<p>Bonjour <strong>{name}</strong>,</p>
{body}
<p style="margin-top: 30px; color: #666; font-size: 14px; text-align: center;">Merci d'utiliser notre service!</p>
</div>"#,
            name = escape(greeting_name),
        )
    }

    /// Request received, awaiting a decision.
    #[must_use]
    pub fn pending(to: &UserContact, details: &ReservationDetails) -> EmailMessage {
        let body = format!(
            "<p>Votre demande de réservation pour <strong>{}</strong> a bien été reçue.</p>{}\
             <p>Votre réservation est en attente de validation par un administrateur.</p>",
            escape(&details.equipment_name),
            details_table(details, true),
        );
        EmailMessage {
            to: to.email.clone(),
            subject: format!("Réservation en attente - {}", details.equipment_name),
            text: format!(
                "Bonjour {},\n\nVotre demande de réservation pour {} a bien été reçue et est en attente de validation.\n\nVous recevrez un email dès qu'elle sera traitée.",
                to.username, details.equipment_name
            ),
            html: layout("#FF9800", "Réservation en attente", &to.username, &body),
        }
    }

    /// Request accepted.
    #[must_use]
    pub fn approved(to: &UserContact, details: &ReservationDetails) -> EmailMessage {
        let body = format!(
            "<p>Bonne nouvelle! Votre réservation pour <strong>{}</strong> a été approuvée.</p>{}\
             <p>Vous pouvez récupérer l'équipement à partir du <strong>{}</strong>.</p>",
            escape(&details.equipment_name),
            details_table(details, false),
            escape(&details.start_date),
        );
        EmailMessage {
            to: to.email.clone(),
            subject: format!("Réservation approuvée - {}", details.equipment_name),
            text: format!(
                "Bonjour {},\n\nBonne nouvelle! Votre réservation pour {} a été approuvée.\n\nVous pouvez récupérer l'équipement à partir du {}.",
                to.username, details.equipment_name, details.start_date
            ),
            html: layout("#4CAF50", "Réservation approuvée", &to.username, &body),
        }
    }

    /// Request declined.
    #[must_use]
    pub fn rejected(
        to: &UserContact,
        details: &ReservationDetails,
        reason: Option<&str>,
    ) -> EmailMessage {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(UNSPECIFIED_REASON);
        let body = format!(
            "<p>Nous sommes désolés, mais votre réservation pour <strong>{}</strong> a été refusée.</p>{}\
             <p><strong>Raison:</strong> {}</p>",
            escape(&details.equipment_name),
            details_table(details, true),
            escape(reason),
        );
        EmailMessage {
            to: to.email.clone(),
            subject: format!("Réservation refusée - {}", details.equipment_name),
            text: format!(
                "Bonjour {},\n\nVotre réservation pour {} a été refusée.\n\nRaison: {reason}",
                to.username, details.equipment_name
            ),
            html: layout("#f44336", "Réservation refusée", &to.username, &body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn contact() -> UserContact {
        UserContact {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            username: "Ada".to_string(),
        }
    }

    fn details() -> ReservationDetails {
        ReservationDetails {
            equipment_name: "Projector".to_string(),
            start_date: "01/03/2024 09:00 UTC".to_string(),
            end_date: "01/03/2024 10:00 UTC".to_string(),
            quantity: 1,
            description: Some("<b>Team</b> demo".to_string()),
        }
    }

    #[test]
    fn test_pending_template() {
        let message = templates::pending(&contact(), &details());
        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Réservation en attente - Projector");
        assert!(message.text.contains("Bonjour Ada"));
        assert!(message.html.contains("01/03/2024 09:00 UTC"));
        assert!(message.html.contains("&lt;b&gt;Team&lt;/b&gt; demo"));
    }

    #[test]
    fn test_approved_template_mentions_start_date() {
        let message = templates::approved(&contact(), &details());
        assert!(message.subject.starts_with("Réservation approuvée"));
        assert!(message.text.contains("01/03/2024 09:00 UTC"));
    }

    #[test]
    fn test_rejected_template_reason_fallback() {
        let with_reason = templates::rejected(&contact(), &details(), Some("Maintenance planned"));
        assert!(with_reason.text.ends_with("Raison: Maintenance planned"));

        let without = templates::rejected(&contact(), &details(), None);
        assert!(without.text.ends_with("Raison: Non spécifiée"));

        let blank = templates::rejected(&contact(), &details(), Some("  "));
        assert!(blank.html.contains(templates::UNSPECIFIED_REASON));
    }

    #[tokio::test]
    async fn test_console_notifier_accepts_everything() {
        let notifier = ConsoleNotifier::new();
        let result = notifier
            .notify(&NotificationKind::Approved, &contact(), &details())
            .await;
        assert!(result.is_ok());
    }
}
