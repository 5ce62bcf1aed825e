//! Attendance polling for class sessions.
//!
//! An instructor opens a short-lived poll for a session and reads out its
//! 8-digit code; students submit the code and each gets at most one
//! attendance record per session, however many requests race in.

pub mod analytics;
pub mod auth;
pub mod code;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod poll;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod submission;

use std::sync::Arc;

use tracing::{info, warn};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use memory::MemoryStore;
pub use routes::create_routes;
pub use state::AppState;

use crate::db::PgStore;
use crate::store::StoreError;

/// Connects the configured backend and assembles the application state.
pub async fn build_state(config: Config) -> Result<AppState, StoreError> {
    match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&config, &database_url).await?;
            info!("using postgres store");
            Ok(AppState::new(Arc::new(PgStore::new(pool)), config))
        }
        None => {
            warn!("DATABASE_URL not set, attendance data lives in memory only");
            Ok(AppState::new(Arc::new(MemoryStore::new()), config))
        }
    }
}
