//! Campus Library lending service
//!
//! Keeps the book catalog and the students in memory, lends and takes back
//! individual copies, and mirrors every student to a remote document store.

use std::sync::Arc;

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;
pub mod store;
pub mod sync;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
