#![deny(missing_docs)]

//! # User Models
//!
//! The stored user record and the DTOs the API contract is written against.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user, secrets included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Users {
    /// Primary key.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Encrypted password.
    pub password_hash: String,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Update timestamp.
    pub updated_at: NaiveDateTime,
}

/// What the API exposes about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Primary key.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Update timestamp.
    pub updated_at: NaiveDateTime,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUsers {
    /// Email address.
    pub email: String,
    /// Encrypted password.
    pub password_hash: String,
}

/// Body of `PATCH /users/:id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateUsers {
    /// New email address.
    pub email: Option<String>,
    /// New encrypted password.
    pub password_hash: Option<String>,
}

/// Path of the single-user routes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPath {
    /// Primary key.
    pub id: Uuid,
}

/// Query of `GET /users`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Keep users whose email contains this text.
    pub email: Option<String>,
    /// Maximum number of users returned.
    pub limit: Option<usize>,
    /// Most recently created first.
    pub newest_first: Option<bool>,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// What went wrong.
    pub message: String,
}

impl ApiMessage {
    /// Creates a message body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
