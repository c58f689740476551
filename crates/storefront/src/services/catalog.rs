//! Catalog service: product listing and admin product creation.
//!
//! Access control for [`CatalogService::add_product`] is applied at the
//! routing layer by [`RequireAdmin`](crate::middleware::RequireAdmin).

use thiserror::Error;
use tracing::{info, instrument};

use kiln_core::Price;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};
use crate::services::validation::FieldErrors;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A form field is missing or malformed.
    #[error("invalid product: {0}")]
    Validation(FieldErrors),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw product form input, exactly as submitted.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub description: String,
    pub material: String,
}

impl ProductInput {
    /// Check every field and parse the price.
    ///
    /// # Errors
    ///
    /// Returns all field problems at once.
    pub fn validate(&self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require("name", &self.name);
        let price = errors.require("price", &self.price).and_then(|raw| {
            Price::parse(&raw)
                .map_err(|e| errors.add("price", e.to_string()))
                .ok()
        });
        let image_url = errors.require("image_url", &self.image_url);
        let description = errors.require("description", &self.description);
        let material = errors.require("material", &self.material);

        match (name, price, image_url, description, material) {
            (Some(name), Some(price), Some(image_url), Some(description), Some(material)) => {
                if name.chars().count() > MAX_NAME_LENGTH {
                    errors.add("name", format!("Name must be at most {MAX_NAME_LENGTH} characters."));
                    return Err(errors);
                }
                Ok(NewProduct {
                    name,
                    image_url,
                    description,
                    material,
                    price,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Matches `VARCHAR(250)` on `shop.products.name`.
const MAX_NAME_LENGTH: usize = 250;

/// Catalog read/write operations.
pub struct CatalogService<'a> {
    products: &'a dyn ProductRepository,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductRepository) -> Self {
        Self { products }
    }

    /// All products in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_products().await?)
    }

    /// Validate and persist a new product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` with every field problem, or
    /// `CatalogError::Repository` if the insert fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        let new_product = input.validate().map_err(CatalogError::Validation)?;
        let product = self.products.create_product(&new_product).await?;

        info!(product_id = %product.id, price = %product.price, "Product added");
        Ok(product)
    }
}
