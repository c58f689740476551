//! Authentication service.
//!
//! Provides email/password registration and login. Establishing the session
//! for the returned user is left to the route, which owns the `Session`.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;
use tracing::{info, instrument, warn};

use kiln_core::Email;

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};
use crate::services::validation::FieldErrors;

/// Authentication service.
///
/// Handles user registration and login against a [`UserRepository`].
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository) -> Self {
        Self { users }
    }

    /// Register a new user with email, password and display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a field is blank or the email is malformed.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        let mut errors = FieldErrors::new();
        let email = errors.require("email", email).and_then(|raw| {
            Email::parse(&raw)
                .map_err(|e| errors.add("email", e.to_string()))
                .ok()
        });
        if password.is_empty() {
            errors.add("password", "This field is required.");
        }
        let name = errors.require("name", name);

        let (Some(email), Some(name)) = (email, name) else {
            return Err(AuthError::Validation(errors));
        };
        errors.into_result().map_err(AuthError::Validation)?;

        // Checked before hashing so a duplicate never reaches the insert.
        if self.users.get_user_by_email(&email).await?.is_some() {
            warn!("Registration attempted with existing email");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;
        let new_user = NewUser {
            email,
            password_hash,
            name,
        };

        // The unique index still catches a concurrent registration.
        let user = self
            .users
            .create_user(&new_user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if either field is blank.
    /// Returns `AuthError::NoSuchAccount` if no account uses this email.
    /// Returns `AuthError::BadPassword` if the password is wrong.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut errors = FieldErrors::new();
        let email = errors.require("email", email);
        if password.is_empty() {
            errors.add("password", "This field is required.");
        }
        let Some(email) = email else {
            return Err(AuthError::Validation(errors));
        };
        errors.into_result().map_err(AuthError::Validation)?;

        // A malformed address cannot belong to any account.
        let Ok(email) = Email::parse(&email) else {
            return Err(missing_account(password));
        };

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            return Err(missing_account(password));
        };

        verify_password(password, &password_hash)?;

        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}

/// Hash that stands in for an account that does not exist.
static ABSENT_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("kiln-absent-account").ok());

/// Run a full verification against [`ABSENT_ACCOUNT_HASH`].
///
/// Unknown emails pay the same Argon2 cost as a wrong password.
fn verify_absent_account(password: &str) -> Result<(), AuthError> {
    let hash = ABSENT_ACCOUNT_HASH
        .as_deref()
        .ok_or(AuthError::PasswordHash)?;
    verify_password(password, hash)
}

fn missing_account(password: &str) -> AuthError {
    let _ = verify_absent_account(password);
    AuthError::NoSuchAccount
}

/// Hash a password using Argon2id with a random salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC hash string (constant-time comparison).
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|e| match e {
            password_hash::Error::Password => AuthError::BadPassword,
            _ => AuthError::PasswordHash,
        })
}
