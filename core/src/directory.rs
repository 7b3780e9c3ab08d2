//! Requester contact lookup.
//!
//! Accounts are owned by the authentication service. The booking service
//! only keeps the contact details it needs to address decision emails,
//! recorded when a user first submits a reservation.

use crate::error::BookingError;
use crate::identity::UserContact;
use crate::types::UserId;
use async_trait::async_trait;

/// Contact details of users who have made reservations.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Inserts or refreshes a contact.
    async fn record(&self, contact: UserContact) -> Result<(), BookingError>;

    /// Looks up a contact.
    async fn find(&self, id: UserId) -> Result<Option<UserContact>, BookingError>;
}
