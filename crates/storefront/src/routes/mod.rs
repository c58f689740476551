//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET|POST /                               - Catalog (optional ?alert=)
//! POST     /alert                          - Redirect home with a login advisory
//! GET      /health                         - Liveness
//! GET      /health/ready                   - Readiness (store ping)
//!
//! # Auth
//! GET|POST /login                          - Login form / action
//! GET|POST /signin                         - Registration form / action
//! GET      /logout                         - End session (requires auth)
//!
//! # Catalog (admin only)
//! GET|POST /addproduct                     - New product form / action
//!
//! # Cart (requires auth)
//! GET|POST /cart                           - Cart with total
//! GET|POST /addcart/{product_id}           - Add one unit, back to /
//! GET|POST /product/{product_id}/user/{user_id} - Remove one unit, back to /cart
//!
//! # Checkout (requires auth)
//! GET      /create-checkout-session        - Redirect to the hosted payment page
//! GET|POST /success                        - Confirmation page
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod home;
pub mod products;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::middleware::{
    StorefrontSessionLayer, request_id_middleware, security_headers_middleware,
};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Static assets, relative to the workspace root.
const STATIC_DIR: &str = "crates/storefront/static";

/// Header data every page needs.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user: Option<CurrentUser>,
    pub is_admin: bool,
}

impl Nav {
    /// Build the header for `user`.
    #[must_use]
    pub fn new(state: &AppState, user: Option<CurrentUser>) -> Self {
        let is_admin = user
            .as_ref()
            .is_some_and(|u| u.id == state.config().admin_user_id);
        Self { user, is_admin }
    }

    /// Header for pages rendered without a known user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signin", get(auth::signin_page).post(auth::signin))
        .route("/logout", get(auth::logout))
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).post(cart::show))
        .route("/addcart/{product_id}", get(cart::add).post(cart::add))
        .route(
            "/product/{product_id}/user/{user_id}",
            get(cart::remove).post(cart::remove),
        )
        .route("/create-checkout-session", get(cart::checkout))
        .route("/success", get(cart::success).post(cart::success))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home).post(home::home))
        .route("/alert", post(home::alert))
        .route(
            "/addproduct",
            get(products::add_product_page).post(products::add_product),
        )
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .merge(cart_routes())
}

/// Assemble the full application: routes, middleware and state.
///
/// The session store is a parameter so tests can run on an in-memory store.
pub fn app<S>(state: AppState, session_layer: StorefrontSessionLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<axum::body::Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            },
        ))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::new().enable_transaction())
}
