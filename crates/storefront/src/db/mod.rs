//! Persistence layer for the storefront.
//!
//! # Database: `kiln`
//!
//! ## Tables (schema `shop`)
//!
//! - `users` - Accounts (email unique, salted password hash)
//! - `products` - Catalog entries
//! - `cart_items` - One row per unit of a product in a user's cart
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p kiln-cli -- migrate
//! ```
//!
//! # Stores
//!
//! Services only see the repository traits below. [`PgStore`] is the
//! production implementation; [`MemoryStore`] keeps the same tables in
//! process memory and backs the test suites.

pub mod cart;
pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use kiln_core::{Email, ProductId, UserId};

use crate::models::{CartItem, CartLine, NewProduct, NewUser, Product, User};

pub use memory::MemoryStore;

/// How long a request may wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The store could not be reached in time (pool exhausted, connection lost).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested (or referenced) entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return Self::Unavailable(err.to_string());
        }
        Self::Database(err)
    }
}

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by their ID.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user by their exact email address.
    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with their stored password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Insert a new user.
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    async fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products ordered by id (insertion order).
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Get a product by its ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a new product.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Cart line storage.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Append one line for `(user_id, product_id)`. Existing lines for the
    /// same pair are left alone.
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartLine, RepositoryError>;

    /// All lines owned by `user_id`, oldest first, joined with their products.
    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Delete the oldest line matching `(user_id, product_id)`.
    ///
    /// Returns `false` when nothing matched.
    async fn remove_one(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// `PostgreSQL`-backed store implementing every repository trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url.expose_secret())
        .await
}

/// Map a sqlx error from an `INSERT`, turning constraint violations into
/// repository-level errors.
fn map_insert_error(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
