//! Cart and checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use kiln_core::{Price, ProductId, UserId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartItem, session_keys};
use crate::routes::Nav;
use crate::services::{CartService, CheckoutEvent, CheckoutService, CheckoutState, cart};
use crate::state::AppState;

/// Query parameters for the cart page.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub notice: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub nav: Nav,
    pub items: Vec<CartItem>,
    pub total: Price,
    pub currency_symbol: &'static str,
    pub notice: Option<&'static str>,
}

/// Payment confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub nav: Nav,
    /// Gateway session id, when the buyer came back from a checkout.
    pub reference: Option<String>,
}

/// Display the cart with its total.
///
/// Reaching the cart with a checkout still pending means the buyer cancelled
/// at the gateway.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse> {
    let pending = session.remove::<String>(session_keys::PENDING_CHECKOUT).await?;
    if let Some(checkout) = CheckoutState::returned(pending, CheckoutEvent::ReturnedToCart) {
        info!(user_id = %user.id, ?checkout, "Buyer cancelled at gateway");
    }

    let items = CartService::new(state.carts(), state.products())
        .list_items(&user)
        .await?;
    let total = cart::total(&items);

    let notice = match query.notice.as_deref() {
        Some("empty") => Some("Your cart is empty. Add something before checking out."),
        _ => None,
    };

    Ok(CartTemplate {
        nav: Nav::new(&state, Some(user)),
        items,
        total,
        currency_symbol: state.config().payments.currency.symbol(),
        notice,
    })
}

/// Add one unit of a product, then go back to the catalog.
///
/// Anonymous visitors are sent to the login page.
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<i32>,
) -> Result<Redirect> {
    let product_id = ProductId::new(product_id);
    CartService::new(state.carts(), state.products())
        .add_item(user.as_ref(), product_id)
        .await?;

    add_breadcrumb("cart", "Added to cart", &[("product_id", product_id.to_string())]);
    Ok(Redirect::to("/"))
}

/// Remove one unit of a product from the signed-in user's cart.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((product_id, user_id)): Path<(i32, i32)>,
) -> Result<Redirect> {
    CartService::new(state.carts(), state.products())
        .remove_item(&user, UserId::new(user_id), ProductId::new(product_id))
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Create a gateway checkout session and send the buyer to it (303).
pub async fn checkout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Redirect> {
    let gateway_session = CheckoutService::new(state.carts(), state.gateway(), state.config())
        .create_checkout_session(user.as_ref())
        .await?;

    session
        .insert(session_keys::PENDING_CHECKOUT, &gateway_session.id)
        .await?;
    Ok(Redirect::to(&gateway_session.url))
}

/// Confirmation page after the gateway redirects back.
///
/// The return itself is the only signal; the cart is left as it is.
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<impl IntoResponse> {
    let reference = session.remove::<String>(session_keys::PENDING_CHECKOUT).await?;
    let checkout = CheckoutState::returned(reference.clone(), CheckoutEvent::ReturnedToSuccess);
    info!(user_id = %user.id, ?checkout, "Buyer returned from gateway");

    Ok(SuccessTemplate {
        nav: Nav::new(&state, Some(user)),
        reference,
    })
}
