//! Perpustakaan School Library Server
//!
//! Circulation backend for a school library: catalog, student carts,
//! loans with return confirmation and fines, and read-only reports,
//! exposed as a REST JSON API.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Kept for the readiness check
    pub pool: Pool<Postgres>,
}
