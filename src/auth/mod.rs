//! Authentication module for the gateway.
//!
//! Provides two credential schemes:
//! - Init data: signed launch parameters issued by the host platform
//! - Session token: HS256 JWT issued by this service at login

mod error;
mod init_data;
mod middleware;
mod session;

pub use error::*;
pub use init_data::*;
pub use middleware::*;
pub use session::*;
