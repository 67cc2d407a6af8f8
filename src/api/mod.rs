//! HTTP API layer for the gateway.
//!
//! Provides the login endpoint behind the authentication middleware.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
