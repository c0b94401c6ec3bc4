pub mod api;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
pub mod startup;

#[cfg(test)]
pub(crate) mod testing;

use api::ClientFactory;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<ClientFactory>,
}

impl AppState {
    pub fn new(clients: Arc<ClientFactory>) -> Self {
        Self { clients }
    }
}
