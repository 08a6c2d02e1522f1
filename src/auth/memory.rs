use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserRepository;
use crate::auth::repo_types::User;
use crate::db::RepoError;

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let storage = self.storage.read().await;
        Ok(storage.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let storage = self.storage.read().await;
        Ok(storage.get(&id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut storage = self.storage.write().await;
        if storage.values().any(|u| u.email == user.email) {
            return Err(RepoError::Duplicate("user"));
        }
        storage.insert(user.id, user.clone());
        Ok(user)
    }
}
