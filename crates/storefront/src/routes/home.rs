//! Home page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::routes::Nav;
use crate::services::CatalogService;
use crate::state::AppState;

/// Advisory shown when an anonymous visitor tries to add to cart.
pub const LOGIN_TO_ADD_ALERT: &str = "Please log in to add items to your cart.";

/// Query parameters for the home page.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub alert: Option<String>,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub products: Vec<Product>,
    pub alert: Option<String>,
    pub currency_symbol: &'static str,
}

/// Display the catalog.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<HomeQuery>,
) -> Result<impl IntoResponse> {
    let products = CatalogService::new(state.products()).list_products().await?;

    Ok(HomeTemplate {
        nav: Nav::new(&state, user),
        products,
        alert: query.alert.filter(|a| !a.is_empty()),
        currency_symbol: state.config().payments.currency.symbol(),
    })
}

/// Send the visitor home with the login advisory.
pub async fn alert() -> Redirect {
    Redirect::to(&format!("/?alert={}", urlencoding::encode(LOGIN_TO_ADD_ALERT)))
}
