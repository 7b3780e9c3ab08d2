//! `PostgreSQL` requester contacts.

use crate::rows::db_error;
use async_trait::async_trait;
use equipment_booking_core::directory::UserDirectory;
use equipment_booking_core::error::BookingError;
use equipment_booking_core::identity::UserContact;
use equipment_booking_core::types::UserId;
use sqlx::PgPool;
use uuid::Uuid;

/// Contacts in the `booking_users` table.
#[derive(Clone, Debug)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn record(&self, contact: UserContact) -> Result<(), BookingError> {
        sqlx::query(
            r"
            INSERT INTO booking_users (id, email, username, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                username = EXCLUDED.username,
                updated_at = now()
            ",
        )
        .bind(*contact.id.as_uuid())
        .bind(&contact.email)
        .bind(&contact.username)
        .execute(&self.pool)
        .await
        .map_err(db_error("record contact"))?;
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<Option<UserContact>, BookingError> {
        let row: Option<(Uuid, String, String)> =
            sqlx::query_as("SELECT id, email, username FROM booking_users WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find contact"))?;
        Ok(row.map(|(id, email, username)| UserContact {
            id: UserId::from_uuid(id),
            email,
            username,
        }))
    }
}
