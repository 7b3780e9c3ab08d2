//! # Equipment Booking Server
//!
//! Axum HTTP surface for the equipment booking service.
//!
//! ## Modules
//!
//! - [`api`]: Reservation, availability and equipment handlers
//! - [`auth`]: Bearer-token verification and permission extractors
//! - [`bootstrap`]: Builds the [`AppState`] from a [`Config`]
//! - [`config`]: Environment-driven configuration
//! - [`error`]: [`AppError`] and its `IntoResponse` mapping
//! - [`health`]: Liveness and readiness probes
//! - [`notify`]: SMTP delivery of status emails
//! - [`routes`]: The router
//!
//! ## Example
//!
//! ```rust,ignore
//! use equipment_booking_server::{Config, bootstrap::build_state, routes::build_router};
//!
//! let config = Config::from_env();
//! let app = build_router(build_state(&config).await?);
//! let listener = tokio::net::TcpListener::bind(config.server.bind_address()?).await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod health;
pub mod notify;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, TokenVerifier};
pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
