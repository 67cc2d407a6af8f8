//! Shared test fixtures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::auth::{data_check_string, InitDataVerifier};
use crate::domain::User;
use crate::storage::{DirectoryError, DirectoryResult, UserDirectory};

pub const BOT_TOKEN: &str = "botsecret";
pub const SESSION_SECRET: &str = "test-session-secret";

/// Build a signed init-data query string for the given fields.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let verifier = InitDataVerifier::new(bot_token).unwrap();
    let map: HashMap<String, String> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = verifier.sign(&data_check_string(&map));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DirectoryBehaviour {
    #[default]
    Normal,
    /// Every call fails as if the database were down.
    Failing,
    /// Every call never completes.
    Hanging,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    register_calls: Vec<(i64, String)>,
    lookup_calls: usize,
}

/// In-memory directory that records every call.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<Mutex<Inner>>,
    behaviour: DirectoryBehaviour,
}

impl InMemoryDirectory {
    pub fn with_behaviour(behaviour: DirectoryBehaviour) -> Self {
        Self {
            behaviour,
            ..Self::default()
        }
    }

    pub fn insert(&self, id: i64, display_name: &str) -> User {
        let user = User::register(id, display_name);
        self.inner.lock().unwrap().users.insert(id, user.clone());
        user
    }

    pub fn register_calls(&self) -> Vec<(i64, String)> {
        self.inner.lock().unwrap().register_calls.clone()
    }

    pub fn lookup_calls(&self) -> usize {
        self.inner.lock().unwrap().lookup_calls
    }

    pub fn total_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.register_calls.len() + inner.lookup_calls
    }

    async fn behave(&self) -> DirectoryResult<()> {
        match self.behaviour {
            DirectoryBehaviour::Normal => Ok(()),
            DirectoryBehaviour::Failing => Err(DirectoryError::Database(sqlx::Error::PoolTimedOut)),
            DirectoryBehaviour::Hanging => std::future::pending().await,
        }
    }
}

impl UserDirectory for InMemoryDirectory {
    async fn get_or_register(&self, id: i64, display_name: &str) -> DirectoryResult<User> {
        self.inner
            .lock()
            .unwrap()
            .register_calls
            .push((id, display_name.to_string()));
        self.behave().await?;

        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .entry(id)
            .or_insert_with(|| User::register(id, display_name))
            .clone())
    }

    async fn get_by_id(&self, id: i64) -> DirectoryResult<User> {
        self.inner.lock().unwrap().lookup_calls += 1;
        self.behave().await?;

        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }
}
