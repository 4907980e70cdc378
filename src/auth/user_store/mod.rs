//! User Storage
//! Mission: One credential store interface, two interchangeable backends

mod memory;
mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

use crate::auth::models::{ProfileUpdate, User};
use crate::config::StoreBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("username already exists")]
    Duplicate,
    #[error("credential store timed out")]
    Timeout,
    #[error("corrupt user record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for user accounts.
///
/// Implementations serialize conflicting writes themselves; callers never
/// lock around them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Apply the `Some` fields of `update` and return the stored result.
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Open the configured backend
pub fn connect(backend: StoreBackend, db_path: &str) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match backend {
        StoreBackend::Sqlite => {
            info!("🗄️  Using SQLite credential store at {}", db_path);
            Arc::new(SqliteUserStore::new(db_path)?)
        }
        StoreBackend::Memory => {
            info!("🗄️  Using in-memory credential store (data is lost on restart)");
            Arc::new(MemoryUserStore::new())
        }
    };
    Ok(store)
}
