//! `PostgreSQL` storage for equipment booking.
//!
//! Implements the storage seams of `equipment-booking-core` on top of sqlx:
//!
//! - [`PostgresEquipmentCatalog`]: `equipment` table
//! - [`PostgresReservationStore`]: `reservations` table, with the half-open
//!   overlap query evaluated in SQL
//! - [`PostgresUserDirectory`]: `booking_users` table
//!
//! Enumerations are stored as their canonical text labels.
//!
//! # Example
//!
//! ```ignore
//! use equipment_booking_postgres::{PoolSettings, connect, migrate, PostgresReservationStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect(&PoolSettings::new("postgres://localhost/booking")).await?;
//!     migrate(&pool).await?;
//!     let reservations = PostgresReservationStore::new(pool);
//!     Ok(())
//! }
//! ```

mod catalog;
mod directory;
mod reservations;
mod rows;

pub use catalog::PostgresEquipmentCatalog;
pub use directory::PostgresUserDirectory;
pub use reservations::PostgresReservationStore;

use equipment_booking_core::error::BookingError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Connection pool settings.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// Connection URL
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl PoolSettings {
    /// Settings for `url` with default pool sizing.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Opens a connection pool.
///
/// # Errors
///
/// Returns [`BookingError::Storage`] if the database cannot be reached.
pub async fn connect(settings: &PoolSettings) -> Result<PgPool, BookingError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .connect(&settings.url)
        .await
        .map_err(|e| BookingError::Storage(format!("Failed to connect to database: {e}")))?;
    info!(
        max_connections = settings.max_connections,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Runs the embedded schema migrations.
///
/// # Errors
///
/// Returns [`BookingError::Storage`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), BookingError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BookingError::Storage(format!("Migration failed: {e}")))?;
    info!("Database migrations applied");
    Ok(())
}

/// Round-trips a trivial query.
pub(crate) async fn ping(pool: &PgPool) -> Result<(), BookingError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| BookingError::Storage(format!("Database ping failed: {e}")))?;
    Ok(())
}
