//! session-core: shared infrastructure for the session client and its demo server.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
