//! In-memory user store.
//!
//! Holds every user ever created, in insertion order. Soft-deleted users stay
//! in the collection so that ids are never handed out twice and so that their
//! emails keep counting towards uniqueness.

use tracing::debug;

use super::error::{UserError, UserResult};
use super::models::{
    SeedUser, UpdateUserRequest, User, UserStats, non_blank, normalize_email, normalize_name,
};

#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `seed`, in order.
    ///
    /// Seed entries go through the same validation as [`UserStore::create`],
    /// so a seed list with a blank field or a repeated email is rejected.
    pub fn seeded<I>(seed: I) -> UserResult<Self>
    where
        I: IntoIterator<Item = SeedUser>,
    {
        let mut store = Self::new();
        for entry in seed {
            store.create(Some(entry.name.as_str()), Some(entry.email.as_str()))?;
        }
        Ok(store)
    }

    /// Active users, in insertion order.
    pub fn list(&self) -> Vec<User> {
        self.users.iter().filter(|u| u.active).cloned().collect()
    }

    pub fn get_by_id(&self, id: u64) -> UserResult<User> {
        self.find_active(id).cloned().ok_or(UserError::NotFound { id })
    }

    pub fn create(&mut self, name: Option<&str>, email: Option<&str>) -> UserResult<User> {
        let (Some(name), Some(email)) = (non_blank(name), non_blank(email)) else {
            return Err(UserError::Validation);
        };

        let email = normalize_email(email);
        if self.email_taken(&email, None) {
            return Err(UserError::Conflict { email });
        }

        let user = User {
            id: self.next_id(),
            name: normalize_name(name),
            email,
            active: true,
        };
        debug!(user_id = user.id, "Appending user");
        self.users.push(user.clone());
        Ok(user)
    }

    /// Apply the supplied fields of `request` to an active user.
    ///
    /// Blank fields are ignored. The email check runs before anything is
    /// written, so a conflicting request leaves the user untouched.
    pub fn update(&mut self, id: u64, request: &UpdateUserRequest) -> UserResult<User> {
        if self.find_active(id).is_none() {
            return Err(UserError::NotFound { id });
        }

        let name = non_blank(request.name.as_deref()).map(normalize_name);
        let email = non_blank(request.email.as_deref()).map(normalize_email);

        if let Some(taken) = email.as_deref().filter(|e| self.email_taken(e, Some(id))) {
            return Err(UserError::Conflict {
                email: taken.to_string(),
            });
        }

        let user = self.find_active_mut(id).ok_or(UserError::NotFound { id })?;
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        Ok(user.clone())
    }

    /// Mark an active user as deleted and return its final state.
    pub fn soft_delete(&mut self, id: u64) -> UserResult<User> {
        let user = self.find_active_mut(id).ok_or(UserError::NotFound { id })?;
        user.active = false;
        Ok(user.clone())
    }

    pub fn stats(&self) -> UserStats {
        UserStats {
            active: self.users.iter().filter(|u| u.active).count(),
            total: self.users.len(),
        }
    }

    fn next_id(&self) -> u64 {
        self.users.iter().map(|u| u.id).max().map_or(1, |max| max + 1)
    }

    /// Whether any stored user other than `except`, deleted or not, holds `email`.
    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email == email)
    }

    fn find_active(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id && u.active)
    }

    fn find_active_mut(&mut self, id: u64) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id && u.active)
    }
}
