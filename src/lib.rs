//! Bookshelf lending server
//!
//! Members share books from their own shelves. This crate holds the lending
//! engine (borrow, return, approve-return), the loan projections built on top
//! of it, and the REST JSON API exposing both.

use std::sync::Arc;

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
}
