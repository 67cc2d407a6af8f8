//! Domain types for the gateway.

mod user;

pub use user::*;
