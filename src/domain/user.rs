//! User domain types.
//!
//! Users are keyed by the numeric id assigned by the host platform.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A user record as held by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Host platform user id.
    pub id: i64,
    /// Name shown to other players.
    pub display_name: String,
    /// Public game handle, generated on registration.
    pub game_id: String,
    /// When the user was registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a freshly registered user.
    pub fn register(id: i64, display_name: impl Into<String>) -> Self {
        Self::with_game_id(id, display_name, generate_game_id())
    }

    /// Create a freshly registered user with a chosen game handle.
    pub fn with_game_id(id: i64, display_name: impl Into<String>, game_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: display_name.into(),
            game_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Short public handle: the first 12 hex digits of a v4 uuid.
pub fn generate_game_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// The identity attached to a request once authentication succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub id: i64,
    pub display_name: String,
    pub game_id: String,
}

impl From<User> for AuthenticatedIdentity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            game_id: user.game_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_generates_game_id() {
        let a = User::register(7, "Alice");
        let b = User::register(8, "Bob");

        assert_eq!(a.game_id.len(), 12);
        assert!(a.game_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.game_id, b.game_id);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_identity_from_user() {
        let user = User::register(42, "Carol");
        let game_id = user.game_id.clone();

        let identity = AuthenticatedIdentity::from(user);
        assert_eq!(identity.id, 42);
        assert_eq!(identity.display_name, "Carol");
        assert_eq!(identity.game_id, game_id);
    }
}
