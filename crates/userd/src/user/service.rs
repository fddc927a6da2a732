//! User service for business logic.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::error::UserResult;
use super::models::{CreateUserRequest, UpdateUserRequest, User, UserStats};
use super::store::UserStore;

/// Service for user management operations.
///
/// Cloning is cheap; all clones share the same store. Each mutating call holds
/// the write lock for its whole check-then-write sequence.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<RwLock<UserStore>>,
}

impl UserService {
    /// Create a new user service over `store`.
    pub fn new(store: UserStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// List active users.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Vec<User> {
        self.store.read().await.list()
    }

    /// Get an active user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: u64) -> UserResult<User> {
        self.store.read().await.get_by_id(id)
    }

    /// Create a new user with validation.
    #[instrument(skip(self, request))]
    pub async fn create_user(&self, request: CreateUserRequest) -> UserResult<User> {
        let user = self
            .store
            .write()
            .await
            .create(request.name.as_deref(), request.email.as_deref())?;
        info!(user_id = user.id, email = %user.email, "Created new user");
        Ok(user)
    }

    /// Update a user.
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, id: u64, request: UpdateUserRequest) -> UserResult<User> {
        let user = self.store.write().await.update(id, &request)?;
        info!(user_id = user.id, "Updated user");
        Ok(user)
    }

    /// Deactivate a user (soft delete).
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: u64) -> UserResult<User> {
        let user = self.store.write().await.soft_delete(id)?;
        warn!(user_id = id, "Deactivated user");
        Ok(user)
    }

    /// Get user statistics.
    pub async fn stats(&self) -> UserStats {
        self.store.read().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{SeedUser, UserError};

    fn service() -> UserService {
        UserService::new(UserStore::seeded(SeedUser::defaults()).unwrap())
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let svc = service();
        let other = svc.clone();

        let created = svc
            .create_user(CreateUserRequest::new("Test User", "test@example.com"))
            .await
            .unwrap();
        assert_eq!(other.get_user(created.id).await.unwrap(), created);
        assert_eq!(other.stats().await, UserStats { active: 3, total: 3 });
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let svc = service();
        svc.delete_user(2).await.unwrap();
        assert_eq!(svc.get_user(2).await, Err(UserError::NotFound { id: 2 }));
        assert_eq!(svc.list_users().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_ids() {
        let svc = service();
        let mut handles = Vec::new();
        for n in 0..32 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.create_user(CreateUserRequest::new(
                    format!("User {n}"),
                    format!("user{n}@example.com"),
                ))
                .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 32);
        assert_eq!(ids.first(), Some(&3));
        assert_eq!(ids.last(), Some(&34));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_creates_admit_one() {
        let svc = service();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.create_user(CreateUserRequest::new("Dup", "dup@example.com"))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
