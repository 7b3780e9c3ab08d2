//! Wiring of storage, delivery and services into an [`AppState`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::from_env();
//! let state = build_state(&config).await?;
//! let app = build_router(state);
//! ```

use crate::auth::TokenVerifier;
use crate::config::{Config, DatabaseConfig, StorageBackend};
use crate::notify::notifier_from_config;
use crate::state::AppState;
use anyhow::Context;
use equipment_booking_core::admission::AdmissionController;
use equipment_booking_core::catalog::{CatalogService, EquipmentCatalog};
use equipment_booking_core::clock::{Clock, SystemClock};
use equipment_booking_core::directory::UserDirectory;
use equipment_booking_core::error::BookingError;
use equipment_booking_core::memory::{
    InMemoryEquipmentCatalog, InMemoryReservationStore, InMemoryUserDirectory,
};
use equipment_booking_core::notifier::Notifier;
use equipment_booking_core::reservations::ReservationStore;
use equipment_booking_postgres::{
    PostgresEquipmentCatalog, PostgresReservationStore, PostgresUserDirectory,
};
use std::sync::Arc;
use tracing::info;

/// The three storage seams, backed by the same backend.
#[derive(Clone)]
pub struct Stores {
    /// Equipment records
    pub catalog: Arc<dyn EquipmentCatalog>,
    /// Reservation records
    pub reservations: Arc<dyn ReservationStore>,
    /// Requester contacts
    pub directory: Arc<dyn UserDirectory>,
}

impl Stores {
    /// Process-local stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(InMemoryEquipmentCatalog::new()),
            reservations: Arc::new(InMemoryReservationStore::new()),
            directory: Arc::new(InMemoryUserDirectory::new()),
        }
    }

    /// `PostgreSQL` stores sharing one pool. Runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the database is unreachable or a
    /// migration fails.
    pub async fn postgres(database: &DatabaseConfig) -> Result<Self, BookingError> {
        let pool = equipment_booking_postgres::connect(&database.pool_settings()).await?;
        equipment_booking_postgres::migrate(&pool).await?;
        Ok(Self {
            catalog: Arc::new(PostgresEquipmentCatalog::new(pool.clone())),
            reservations: Arc::new(PostgresReservationStore::new(pool.clone())),
            directory: Arc::new(PostgresUserDirectory::new(pool)),
        })
    }
}

/// Builds the application state from already constructed collaborators.
#[must_use]
pub fn assemble(
    config: &Config,
    stores: Stores,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let controller = Arc::new(AdmissionController::new(
        Arc::clone(&stores.catalog),
        Arc::clone(&stores.reservations),
        stores.directory,
        notifier,
        Arc::clone(&clock),
        config.admission,
    ));
    let catalog = CatalogService::new(Arc::clone(&stores.catalog), clock);
    let tokens = Arc::new(TokenVerifier::new(&config.auth.jwt_secret));
    AppState::new(controller, catalog, tokens, stores.catalog, stores.reservations)
}

/// Builds the application state described by `config`.
///
/// # Errors
///
/// Fails if the storage backend cannot be reached or the email sender is invalid.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let stores = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data will not survive a restart");
            Stores::in_memory()
        },
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            Stores::postgres(&config.database)
                .await
                .context("Failed to initialise PostgreSQL storage")?
        },
    };
    let notifier = notifier_from_config(&config.email).context("Invalid email configuration")?;
    info!(
        auto_decide = config.admission.auto_decide,
        creation_active = ?config.admission.creation_active,
        mark_occupied = config.admission.mark_occupied_on_approval,
        "Admission policy loaded"
    );
    Ok(assemble(config, stores, notifier, Arc::new(SystemClock)))
}
