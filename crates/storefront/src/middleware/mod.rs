//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. Security headers
//! 5. Session layer (tower-sessions, signed cookie)

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AdminGuard, Forbidden, OptionalAuth, RequireAdmin, RequireAuth, clear_current_user,
    current_user, set_current_user,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{StorefrontSessionLayer, create_session_layer};
