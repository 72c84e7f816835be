//! Library entrypoint for the price-alert engine.
//!
//! The binary wires MongoDB into [`AppState`]; integration tests under
//! `tests/` wire the in-memory store instead.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stores;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub alerts: Arc<dyn stores::AlertStore>,
    pub notifications: Arc<dyn stores::NotificationStore>,
}
