//! HomeConnect Auth Server Library
//!
//! Email passcode signup and password reset on top of a SQLite user store.
//! Exported for the binary and for integration tests.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod otp;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};
pub use mail::Mailer;
pub use routes::router;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new AppState from an open database, configuration and mailer
    pub fn new(db: Db, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, config, mailer }
    }
}
