//! The user directory seam used by the authentication middleware.

use std::future::Future;

use thiserror::Error;

use crate::domain::User;

/// Errors returned by a user directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt user record: {0}")]
    Corrupt(String),

    #[error("user directory call timed out")]
    Timeout,
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Resolves and stores user records.
///
/// Implementations own persistence and any caching. Calls must be cancel
/// safe: the middleware drops the future on timeout or client disconnect.
pub trait UserDirectory: Clone + Send + Sync + 'static {
    /// Fetch the user with `id`, registering it first if absent.
    ///
    /// Idempotent; an existing user is returned unchanged.
    fn get_or_register(
        &self,
        id: i64,
        display_name: &str,
    ) -> impl Future<Output = DirectoryResult<User>> + Send;

    /// Fetch the user with `id`, or [`DirectoryError::NotFound`].
    fn get_by_id(&self, id: i64) -> impl Future<Output = DirectoryResult<User>> + Send;
}
