//! In-memory credential store

use super::{CredentialStore, StoreError};
use crate::auth::models::{ProfileUpdate, User};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_username: HashMap<String, Uuid>,
}

/// Process-local user storage. Writers are serialized by the lock.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .by_username
            .get(username)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.by_username.contains_key(&user.username) {
            return Err(StoreError::Duplicate);
        }
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Backend(anyhow!("user id {} already exists", user.id)));
        }
        inner.by_username.insert(user.username.clone(), user.id);
        inner.users.insert(user.id, user.clone());

        info!("✅ Created user: {} ({})", user.username, user.role);
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = phone.clone();
        }
        if let Some(image) = &update.image {
            user.image = Some(image.clone());
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let user = inner.users.remove(&id).ok_or(StoreError::NotFound)?;
        inner.by_username.remove(&user.username);

        info!("🗑️  Deleted user: {}", id);
        Ok(())
    }
}
