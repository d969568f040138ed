//! The backend for Paddy, a peer assessment app for group projects.
//!
//! Students rate their teammates (and instructors) along four rubric
//! dimensions and earn rice grains for the ratings they receive.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod util;


use crate::config::Config;
use crate::db::Store;

/// Everything handlers need, shared across requests.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }
}
