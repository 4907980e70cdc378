//! SQLite-backed credential store

use super::{CredentialStore, StoreError};
use crate::auth::models::{ProfileUpdate, User};
use crate::auth::roles::Role;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str =
    "id, username, email, phone, image, password_hash, role, created_at, last_login";

/// User storage with SQLite backend
///
/// Each call opens its own connection on the blocking pool; SQLite itself
/// serializes concurrent writers.
pub struct SqliteUserStore {
    db_path: String,
}

impl SqliteUserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = open_connection(&self.db_path).context("Failed to open auth database")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                image TEXT,
                password_hash TEXT NOT NULL,
                role INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            )",
            [],
        )
        .context("Failed to create users table")?;

        Ok(())
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(anyhow!("SQLite task failed: {}", e)))?
    }
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            // Only the username UNIQUE index; PK and NOT NULL failures are bugs
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Duplicate
            }
            _ => StoreError::Backend(err.into()),
        }
    }
}

/// Raw column values, checked before they become a [`User`]
struct UserRow {
    id: String,
    username: String,
    email: String,
    phone: String,
    image: Option<String>,
    password_hash: String,
    role: i64,
    created_at: String,
    last_login: Option<String>,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            image: row.get(4)?,
            password_hash: row.get(5)?,
            role: row.get(6)?,
            created_at: row.get(7)?,
            last_login: row.get(8)?,
        })
    }

    fn into_user(self) -> Result<User, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Corrupt(format!("bad id {:?}: {}", self.id, e)))?;
        let role = Role::from_code(self.role).ok_or_else(|| {
            StoreError::Corrupt(format!("user {} has unknown role {}", id, self.role))
        })?;
        let last_login = self.last_login.as_deref().map(parse_time).transpose()?;

        Ok(User {
            id,
            username: self.username,
            email: self.email,
            phone: self.phone,
            image: self.image,
            password_hash: self.password_hash,
            role,
            created_at: parse_time(&self.created_at)?,
            last_login,
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

fn select_by_id(conn: &Connection, id: &str) -> Result<Option<User>, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        UserRow::from_row,
    )
    .optional()?
    .map(UserRow::into_user)
    .transpose()
}

#[async_trait]
impl CredentialStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                UserRow::from_row,
            )
            .optional()?
            .map(UserRow::into_user)
            .transpose()
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.run(move |conn| select_by_id(conn, &id.to_string()))
            .await
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, phone, image, password_hash, role, created_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.phone,
                    user.image,
                    user.password_hash,
                    user.role.code(),
                    user.created_at.to_rfc3339(),
                    user.last_login.map(|t| t.to_rfc3339()),
                ],
            )?;

            info!("✅ Created user: {} ({})", user.username, user.role);
            Ok(())
        })
        .await
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.run(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                params![at.to_rfc3339(), id.to_string()],
            )?;
            if rows_affected == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, StoreError> {
        let update = update.clone();
        self.run(move |conn| {
            let id = id.to_string();
            let rows_affected = conn.execute(
                "UPDATE users SET
                    email = COALESCE(?1, email),
                    phone = COALESCE(?2, phone),
                    image = COALESCE(?3, image)
                 WHERE id = ?4",
                params![update.email, update.phone, update.image, id],
            )?;
            if rows_affected == 0 {
                return Err(StoreError::NotFound);
            }
            select_by_id(conn, &id)?.ok_or(StoreError::NotFound)
        })
        .await
    }

    /// Delete a user by ID
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
            if rows_affected == 0 {
                return Err(StoreError::NotFound);
            }

            info!("🗑️  Deleted user: {}", id);
            Ok(())
        })
        .await
    }
}
