//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. Route handlers return `Result<T, AppError>`;
//! errors that have a recovery path (login, cart) become redirects, the rest
//! render the error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::payments::GatewayError;
use crate::routes::Nav;
use crate::services::{AuthError, CartError, CatalogError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Registration or login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Generic error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub message: &'static str,
}

/// What the client gets for an error.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Redirect(&'static str),
    Page(StatusCode, &'static str),
}

const STORE_UNAVAILABLE: &str = "The shop is temporarily unavailable. Please try again shortly.";
const GATEWAY_UNAVAILABLE: &str =
    "We couldn't reach the payment provider. Your cart is unchanged; please try again.";
const INTERNAL: &str = "Something went wrong. Please try again.";

fn repository_outcome(err: &RepositoryError) -> Outcome {
    match err {
        RepositoryError::Unavailable(_) => {
            Outcome::Page(StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE)
        }
        RepositoryError::NotFound => Outcome::Page(StatusCode::NOT_FOUND, "Not found."),
        RepositoryError::Database(_)
        | RepositoryError::DataCorruption(_)
        | RepositoryError::Conflict(_) => Outcome::Page(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
    }
}

impl AppError {
    fn outcome(&self) -> Outcome {
        match self {
            Self::Database(err) => repository_outcome(err),
            Self::Auth(err) => match err {
                AuthError::Validation(_) => {
                    Outcome::Page(StatusCode::BAD_REQUEST, "Please fill in every field.")
                }
                AuthError::DuplicateEmail => Outcome::Redirect("/login?error=already_registered"),
                AuthError::NoSuchAccount | AuthError::BadPassword => {
                    Outcome::Redirect("/login?error=invalid_credentials")
                }
                AuthError::Repository(err) => repository_outcome(err),
                AuthError::PasswordHash => Outcome::Page(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) => {
                    Outcome::Page(StatusCode::BAD_REQUEST, "The product is not valid.")
                }
                CatalogError::Repository(err) => repository_outcome(err),
            },
            Self::Cart(err) => match err {
                CartError::Unauthenticated => Outcome::Redirect("/login"),
                CartError::UnknownProduct(_) => {
                    Outcome::Page(StatusCode::NOT_FOUND, "That product does not exist.")
                }
                CartError::NotOwner => Outcome::Page(StatusCode::FORBIDDEN, "Forbidden."),
                CartError::Repository(err) => repository_outcome(err),
            },
            Self::Checkout(err) => match err {
                CheckoutError::Unauthenticated => Outcome::Redirect("/login"),
                CheckoutError::EmptyCart => Outcome::Redirect("/cart?notice=empty"),
                CheckoutError::InvalidAmount { .. } => {
                    Outcome::Page(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
                }
                CheckoutError::Gateway(GatewayError::Unavailable(_)) => {
                    Outcome::Page(StatusCode::SERVICE_UNAVAILABLE, GATEWAY_UNAVAILABLE)
                }
                CheckoutError::Gateway(_) => {
                    Outcome::Page(StatusCode::BAD_GATEWAY, GATEWAY_UNAVAILABLE)
                }
                CheckoutError::Repository(err) => repository_outcome(err),
            },
            Self::Session(_) => Outcome::Page(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let outcome = self.outcome();

        // Capture server errors to Sentry
        if matches!(&outcome, Outcome::Page(status, _) if status.is_server_error()) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match outcome {
            Outcome::Redirect(to) => Redirect::to(to).into_response(),
            Outcome::Page(status, message) => {
                let page = ErrorTemplate {
                    nav: Nav::anonymous(),
                    status: status.as_u16(),
                    message,
                };
                (status, page).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
