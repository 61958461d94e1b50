//! Hospital Supply Tracking Platform - Inventory Core
//!
//! The dual-mode inventory distribution-return engine: keeps stock counts and
//! per-item lifecycle state consistent across import, distribute, return and
//! mark-used operations, for bulk-counted supplies and individually-tracked
//! units (unique barcode per physical unit).
//!
//! The HTTP shell (routing, authentication, rendering) lives outside this
//! workspace and consumes the services exposed here; every operation is a
//! single atomic database transaction.

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Application state shared across the embedding server's handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}
