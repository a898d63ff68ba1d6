#![deny(missing_docs)]

//! # User Store
//!
//! In-memory storage standing in for the database.

use crate::models::{ListQuery, NewUsers, UpdateUsers, Users};
use chrono::Utc;
use derive_more::Display;
use std::sync::RwLock;
use uuid::Uuid;

/// Failure of a store operation.
#[derive(Debug, Display, PartialEq)]
pub enum StoreError {
    /// No user with that id.
    #[display("User {_0} not found")]
    NotFound(Uuid),
    /// Another user already holds that email.
    #[display("Email '{_0}' is already registered")]
    EmailTaken(String),
    /// A writer panicked while holding the lock.
    #[display("User store is unavailable")]
    Poisoned,
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for StoreError {}

/// Store result alias.
pub type StoreResult<T> = Result<T, StoreError>;

/// Users kept in insertion order.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<Vec<Users>>,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Users matching `query`.
    pub fn list(&self, query: &ListQuery) -> StoreResult<Vec<Users>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        let mut found: Vec<Users> = users
            .iter()
            .filter(|u| match &query.email {
                Some(needle) => u.email.contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        if query.newest_first.unwrap_or(false) {
            found.reverse();
        }
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    /// The user with `id`.
    pub fn get(&self, id: Uuid) -> StoreResult<Users> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Inserts a new user.
    pub fn insert(&self, new: NewUsers) -> StoreResult<Users> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken(new.email));
        }
        let now = Utc::now().naive_utc();
        let user = Users {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    /// Applies the set fields of `changes` to the user with `id`.
    pub fn update(&self, id: Uuid, changes: UpdateUsers) -> StoreResult<Users> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::EmailTaken(email.clone()));
            }
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now().naive_utc();
        Ok(user.clone())
    }

    /// Removes the user with `id`.
    pub fn remove(&self, id: Uuid) -> StoreResult<Users> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(users.remove(index))
    }
}
