use super::StoreError;
use crate::error::Result;
use crate::security::{hash_password, verify_password};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A registered principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub hashed_password: String,
    pub role: String,
}

impl User {
    /// Build a user, hashing `password`
    pub fn new(username: impl Into<String>, password: &str, role: impl Into<String>) -> Result<Self> {
        Ok(Self {
            username: username.into(),
            hashed_password: hash_password(password)?,
            role: role.into(),
        })
    }

    pub fn is_correct_password(&self, password: &str) -> Result<bool> {
        verify_password(password, &self.hashed_password)
    }
}

pub trait UserStore: Send + Sync {
    /// Store a copy of `user`; fails if the username is taken
    fn save(&self, user: &User) -> std::result::Result<(), StoreError>;

    /// Copy of the user named `username`, if any
    fn find(&self, username: &str) -> Option<User>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> std::result::Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(StoreError::UserExists(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn find(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }
}
