//! Admin product creation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::Nav;
use crate::services::{CatalogError, CatalogService, FieldErrors, ProductInput};
use crate::state::AppState;

/// New product form data. Every field arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub description: String,
    pub material: String,
}

impl From<ProductForm> for ProductInput {
    fn from(form: ProductForm) -> Self {
        Self {
            name: form.name,
            price: form.price,
            image_url: form.image_url,
            description: form.description,
            material: form.material,
        }
    }
}

/// New product page template.
#[derive(Template, WebTemplate)]
#[template(path = "addproduct.html")]
pub struct AddProductTemplate {
    pub nav: Nav,
    pub form: ProductInput,
    pub errors: FieldErrors,
}

/// Display the new product form.
pub async fn add_product_page(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> impl IntoResponse {
    AddProductTemplate {
        nav: Nav::new(&state, Some(admin)),
        form: ProductInput::default(),
        errors: FieldErrors::new(),
    }
}

/// Handle the new product form.
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = ProductInput::from(form);

    match CatalogService::new(state.products()).add_product(&input).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(CatalogError::Validation(errors)) => {
            let page = AddProductTemplate {
                nav: Nav::new(&state, Some(admin)),
                form: input,
                errors,
            };
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(other) => Err(AppError::from(other)),
    }
}
