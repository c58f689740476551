//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::validation::FieldErrors;

/// Errors that can occur during registration and login.
///
/// `NoSuchAccount` and `BadPassword` are kept apart for logging; the login
/// page shows the same message for both.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A form field is missing or malformed.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    /// An account with this email already exists.
    #[error("email already registered")]
    DuplicateEmail,

    /// No account with this email.
    #[error("no such account")]
    NoSuchAccount,

    /// The password did not match the stored hash.
    #[error("incorrect password")]
    BadPassword,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message shown on the login page for a failed attempt.
    #[must_use]
    pub const fn login_message(&self) -> &'static str {
        match self {
            Self::NoSuchAccount | Self::BadPassword => "Invalid email or password.",
            Self::DuplicateEmail => "You've already signed up with that email, log in instead.",
            Self::Validation(_) => "Please correct the errors below.",
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong. Please try again."
            }
        }
    }
}
