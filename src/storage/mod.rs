//! Storage layer for the gateway.
//!
//! The authentication core talks to users through [`UserDirectory`]; the
//! bundled implementation is SQLx over SQLite.

mod directory;
mod models;
mod repository;

pub use directory::{DirectoryError, DirectoryResult, UserDirectory};
pub use repository::SqliteUserDirectory;
