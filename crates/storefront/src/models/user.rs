//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use kiln_core::{Email, UserId};

/// A registered storefront account.
///
/// The password hash is deliberately not part of this type; it only travels
/// alongside a `User` when a login needs to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID, stable for the lifetime of the account.
    pub id: UserId,
    /// Login email, unique across accounts.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    /// PHC-format password hash. Never the raw password.
    pub password_hash: String,
    pub name: String,
}
