//! Identity extractors and the admin gate.
//!
//! The signed-in user lives in the session as a [`CurrentUser`]. Handlers
//! ask for it through an extractor:
//!
//! - [`RequireAuth`] - redirects anonymous visitors to `/login`
//! - [`OptionalAuth`] - never rejects
//! - [`RequireAdmin`] - answers 403 unless the user is the configured admin

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::warn;

use kiln_core::UserId;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Look up the signed-in user for this session.
///
/// A session that cannot be read counts as anonymous.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Cart for {}", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(AuthRejection)?;
        let user = current_user(session).await.ok_or(AuthRejection)?;
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// The admin gate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forbidden;

impl IntoResponse for Forbidden {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// Check applied before every admin-only operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGuard {
    admin_id: UserId,
}

impl AdminGuard {
    #[must_use]
    pub const fn new(admin_id: UserId) -> Self {
        Self { admin_id }
    }

    /// Allow only the admin. No identity at all is forbidden too.
    ///
    /// # Errors
    ///
    /// Returns [`Forbidden`] for anonymous or non-admin users.
    pub fn check(&self, user: Option<&CurrentUser>) -> Result<(), Forbidden> {
        match user {
            Some(user) if user.id == self.admin_id => Ok(()),
            _ => Err(Forbidden),
        }
    }
}

/// Extractor that requires the admin account.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Forbidden;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        let guard = AdminGuard::new(state.config().admin_user_id);
        if let Err(forbidden) = guard.check(user.as_ref()) {
            warn!(
                user_id = ?user.as_ref().map(|u| u.id),
                path = %parts.uri.path(),
                "Admin-only route refused"
            );
            return Err(forbidden);
        }

        user.map(Self).ok_or(Forbidden)
    }
}

/// Store `user` as the signed-in user, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// End the session entirely (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot delete the record.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
