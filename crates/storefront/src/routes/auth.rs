//! Authentication route handlers.
//!
//! Handles login, registration (`/signin`) and logout with email/password
//! accounts stored locally.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::Nav;
use crate::services::{AuthError, AuthService, FieldErrors};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct SigninForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub message: Option<&'static str>,
    pub email: String,
    pub errors: FieldErrors,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "signin.html")]
pub struct SigninTemplate {
    pub nav: Nav,
    pub email: String,
    pub name: String,
    pub errors: FieldErrors,
}

/// Map an `?error=` code to the message shown above the login form.
fn login_notice(code: Option<&str>) -> Option<&'static str> {
    match code? {
        "already_registered" => Some(AuthError::DuplicateEmail.login_message()),
        "invalid_credentials" => Some(AuthError::BadPassword.login_message()),
        _ => None,
    }
}

/// Bind `user` to the session and the Sentry scope.
async fn establish_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id);
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: Nav::new(&state, user),
        message: login_notice(query.error.as_deref()),
        email: String::new(),
        errors: FieldErrors::new(),
    }
}

/// Handle login form submission.
///
/// Both "no such account" and "wrong password" re-render the form with the
/// same message.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let result = AuthService::new(state.users())
        .login(&form.email, &form.password)
        .await;

    match result {
        Ok(user) => {
            establish_session(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err @ (AuthError::NoSuchAccount | AuthError::BadPassword)) => {
            warn!(reason = %err, "Login failed");
            let page = LoginTemplate {
                nav: Nav::anonymous(),
                message: Some(err.login_message()),
                email: form.email,
                errors: FieldErrors::new(),
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let page = LoginTemplate {
                nav: Nav::anonymous(),
                message: None,
                email: form.email,
                errors,
            };
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(other) => Err(AppError::from(other)),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn signin_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    SigninTemplate {
        nav: Nav::new(&state, user),
        email: String::new(),
        name: String::new(),
        errors: FieldErrors::new(),
    }
}

/// Handle registration form submission.
///
/// A new account is logged in straight away. An email that is already
/// registered sends the visitor to the login page instead.
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SigninForm>,
) -> Result<Response> {
    let result = AuthService::new(state.users())
        .register(&form.email, &form.password, &form.name)
        .await;

    match result {
        Ok(user) => {
            establish_session(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::DuplicateEmail) => {
            Ok(Redirect::to("/login?error=already_registered").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let page = SigninTemplate {
                nav: Nav::anonymous(),
                email: form.email,
                name: form.name,
                errors,
            };
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(other) => Err(AppError::from(other)),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// End the session and go home.
pub async fn logout(RequireAuth(user): RequireAuth, session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    info!(user_id = %user.id, "User logged out");
    Ok(Redirect::to("/"))
}
