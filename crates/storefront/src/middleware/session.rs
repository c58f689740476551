//! Session middleware configuration.
//!
//! Sessions are stored server-side (`PostgreSQL` in production, memory in
//! tests); the browser only holds a signed session id cookie.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "kiln_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The session layer type used by the router.
pub type StorefrontSessionLayer<S> = SessionManagerLayer<S, SignedCookie>;

/// Derive the 64-byte cookie signing key from the configured secret.
#[must_use]
pub fn signing_key(config: &StorefrontConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Create the session layer over `store`.
///
/// The `PostgreSQL` store needs the `tower_sessions.session` table from the
/// migrations.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> StorefrontSessionLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}
