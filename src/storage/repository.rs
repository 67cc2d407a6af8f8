//! SQLite-backed user directory.

use sqlx::sqlite::SqlitePool;

use crate::domain::{generate_game_id, User};
use crate::storage::models::UserRow;
use crate::storage::{DirectoryError, DirectoryResult, UserDirectory};

/// Fresh game ids tried before a registration gives up.
const REGISTER_ATTEMPTS: u32 = 3;

/// User directory stored in a single `users` table.
#[derive(Clone)]
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> DirectoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL,
                game_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, id: i64) -> DirectoryResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Insert the user unless the id is already taken. Returns whether a row was written.
    async fn insert_if_absent(&self, candidate: &User) -> Result<bool, sqlx::Error> {
        let created_at = candidate.created_at.to_rfc3339();

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, display_name, game_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.display_name)
        .bind(&candidate.game_id)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    // A colliding game id is the only UNIQUE failure left once `id` conflicts are ignored.
    async fn register_with(
        &self,
        id: i64,
        display_name: &str,
        mut next_game_id: impl FnMut() -> String,
    ) -> DirectoryResult<User> {
        let mut attempt = 1;
        loop {
            let candidate = User::with_game_id(id, display_name, next_game_id());
            match self.insert_if_absent(&candidate).await {
                Ok(true) => {
                    tracing::info!(user_id = id, game_id = %candidate.game_id, "Registered new user");
                    break;
                }
                Ok(false) => break,
                Err(sqlx::Error::Database(e))
                    if e.is_unique_violation() && attempt < REGISTER_ATTEMPTS =>
                {
                    tracing::warn!(user_id = id, attempt, "Game id already taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.fetch(id).await?.ok_or(DirectoryError::NotFound(id))
    }
}

impl UserDirectory for SqliteUserDirectory {
    async fn get_or_register(&self, id: i64, display_name: &str) -> DirectoryResult<User> {
        self.register_with(id, display_name, generate_game_id).await
    }

    async fn get_by_id(&self, id: i64) -> DirectoryResult<User> {
        self.fetch(id).await?.ok_or(DirectoryError::NotFound(id))
    }
}
